//! TrialResult: one trial's trace plus its assertion evaluations and score.

use crate::eval::EvalResult;
use crate::ids::{RunId, TraceId};
use crate::trace::Trace;
use serde::{Deserialize, Serialize};

/// Whether a trial produced a scorable trace or failed before one existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    /// The trial ran to some conclusion and was scored — even a captured
    /// adapter failure inside the trace still scores (usually to 0).
    Ok,
    /// The trial never produced a real trace: adapter construction failed,
    /// or retries were exhausted before a single attempt completed.
    InfraError,
}

/// Outcome of running and scoring a single trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialResult {
    /// 0-based trial index within the suite run.
    pub trial_index: u32,
    /// Id of the suite run this trial belongs to.
    pub run_id: RunId,
    /// Id of this trial's trace, mirrors `trace.id`.
    pub trace_id: TraceId,
    /// Whether this trial produced a real trace or failed at the
    /// infrastructure level.
    pub status: TrialStatus,
    /// The trial's full execution trace (a stub when `status ==
    /// InfraError`).
    pub trace: Trace,
    /// Evaluation of every assertion declared on the scenario, in
    /// declaration order. Empty for infra-error trials.
    pub evaluations: Vec<EvalResult>,
    /// Weighted score in `[0, 1]`.
    pub score: f64,
    /// `true` if a `required` assertion failed. A hard fail forces
    /// `score == 0.0` regardless of other assertions.
    pub hard_failed: bool,
    /// `true` if `score >= scenario.pass_threshold` and `!hard_failed`.
    pub passed: bool,
    /// Retry attempts used to reach this outcome (0 if the first attempt
    /// succeeded or its failure was non-retryable).
    pub retry_count: u32,
    /// Top-level error summary, mirrored from `trace.error` so callers
    /// don't need to reach into the trace for the common case.
    pub error: Option<String>,
}

impl TrialResult {
    /// Whether every evaluation in this trial passed.
    pub fn all_passed(&self) -> bool {
        self.evaluations.iter().all(|e| e.passed)
    }

    /// Build an infra-error result for a trial that never produced a real
    /// trace.
    #[allow(clippy::too_many_arguments)]
    pub fn infra_error(run_id: RunId, trace_id: TraceId, trial_index: u32, scenario_id: impl Into<String>, scenario_hash: impl Into<String>, provider: impl Into<String>, model: impl Into<String>, retry_count: u32, error: impl Into<String>) -> Self {
        let error = error.into();
        let trace = Trace::stub(trace_id.clone(), scenario_id, scenario_hash, provider, model, trial_index, error.clone());
        Self {
            trial_index,
            run_id,
            trace_id,
            status: TrialStatus::InfraError,
            trace,
            evaluations: Vec::new(),
            score: 0.0,
            hard_failed: false,
            passed: false,
            retry_count,
            error: Some(error),
        }
    }
}
