//! Shared data model for Salvo.
//!
//! Defines the shapes every other crate in the workspace passes around:
//! `Scenario` in, `SuiteResult` out, with `Trace`/`Assertion`/`EvalResult`/
//! `TrialResult` as the intermediate stages. No provider knowledge, no
//! storage format, no scoring logic — just the types and the handful of
//! pure helpers (content hashing, ID generation) those types need.

pub mod assertion;
pub mod eval;
pub mod ids;
pub mod message;
pub mod recorded;
pub mod scenario;
pub mod suite;
pub mod trace;
pub mod trial;

pub use assertion::{Assertion, AssertionCommon, Criterion, Operator, SequenceMode};
pub use eval::EvalResult;
pub use ids::{time_sortable_id, RevalId, RunId, ScenarioId, TraceId};
pub use message::{AdapterConfig, AdapterTurnResult, FinishReason, Message, Role, ToolCall, ToolDefinition, TokenUsage};
pub use recorded::{ManifestEntry, RecordMode, RecordedTrace, RevalResult, RECORDED_TRACE_SCHEMA_VERSION};
pub use scenario::{Scenario, ScenarioError};
pub use suite::{FailureRankingEntry, SuiteResult, Verdict};
pub use trace::{StopCondition, Trace, Turn};
pub use trial::{TrialResult, TrialStatus};
