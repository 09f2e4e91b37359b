//! Persisted wrappers that live downstream of a `Trace`: the recorder's
//! on-disk schema and the re-evaluator's output.

use crate::eval::EvalResult;
use crate::ids::{RevalId, TraceId};
use crate::trace::Trace;
use serde::{Deserialize, Serialize};

/// Bumped whenever `RecordedTrace`'s on-disk shape changes in a way a
/// reader needs to know about.
pub const RECORDED_TRACE_SCHEMA_VERSION: u32 = 1;

/// Whether a recorded trace carries full message/tool-argument content or
/// only structural metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    /// Redacted but otherwise complete content.
    Full,
    /// Message content and tool arguments replaced with a sentinel; only
    /// roles, tool names, turn counts, and usage survive.
    MetadataOnly,
}

/// On-disk schema for a recorded trial trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedTrace {
    pub schema_version: u32,
    pub mode: RecordMode,
    pub trace: Trace,
}

impl RecordedTrace {
    pub fn new(mode: RecordMode, trace: Trace) -> Self {
        Self { schema_version: RECORDED_TRACE_SCHEMA_VERSION, mode, trace }
    }
}

/// One run manifest's entry for a single recorded trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub trace_id: TraceId,
    pub trial_index: u32,
    pub status: String,
}

/// Result of re-evaluating a recorded trace's assertions, persisted under
/// `revals/<reval_id>.json` — a separate directory from the run index so a
/// re-evaluation never contaminates the original run's results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalResult {
    pub reval_id: RevalId,
    pub original_trace_id: TraceId,
    pub scenario_hash_at_reeval: String,
    pub eval_results: Vec<EvalResult>,
    pub score: f64,
    pub passed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TraceId as _TraceId;

    #[test]
    fn recorded_trace_carries_the_current_schema_version() {
        let trace = crate::trace::Trace::stub(_TraceId::new("t1"), "s", "h", "openai", "gpt-4o-mini", 0, "boom");
        let recorded = RecordedTrace::new(RecordMode::Full, trace);
        assert_eq!(recorded.schema_version, RECORDED_TRACE_SCHEMA_VERSION);
    }
}
