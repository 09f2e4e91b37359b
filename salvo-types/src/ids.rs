//! Typed ID wrappers for runs, traces, trials, and re-evaluations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed IDs prevent mixing up a run id with a trace id at a call site —
/// they're plain strings underneath, no format is enforced beyond what the
/// constructor that produces them chooses to generate.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap any string-like value as this ID.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(RunId, "Unique, time-sortable identifier for a suite run.");
typed_id!(TraceId, "Unique, time-sortable identifier for a trial's trace.");
typed_id!(RevalId, "Unique identifier for a re-evaluation result.");
typed_id!(ScenarioId, "Identifier for a scenario, usually its filename stem.");

/// Generate a time-sortable identifier (UUIDv7-like: monotonic, k-sortable).
///
/// Used for `RunId`/`TraceId` so that lexicographic sort order matches
/// creation order, which the storage layout (`runs/<run_id>.json`) and the
/// manifest rely on for "most recent" lookups.
pub fn time_sortable_id() -> String {
    uuid::Uuid::now_v7().to_string()
}
