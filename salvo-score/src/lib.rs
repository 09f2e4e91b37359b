//! Weighted scoring of a trial's assertion evaluations.
//!
//! A pure function: evaluations in, `TrialResult` out. No I/O, no provider
//! calls — those already happened in `salvo-eval`.

use salvo_types::{EvalResult, RunId, Trace, TraceId, TrialResult, TrialStatus};

/// Score a trial from its trace and the evaluations run against it.
///
/// A scenario with no assertions (or whose assertions all carry zero
/// weight) is degenerate: `score = 0.0, passed = false, hard_failed =
/// false`, distinct from both a hard fail and a clean pass. Any failed
/// `required` assertion forces `score = 0.0` and `hard_failed = true`,
/// overriding whatever the weighted average would otherwise be — a
/// required assertion is a correctness gate, not one more data point in
/// the average.
pub fn score_trial(run_id: RunId, trace_id: TraceId, trial_index: u32, retry_count: u32, trace: Trace, evaluations: Vec<EvalResult>, pass_threshold: f64) -> TrialResult {
    let (score, passed, hard_failed) = weighted_score(&evaluations, pass_threshold);
    let error = trace.error.clone();

    TrialResult {
        trial_index,
        run_id,
        trace_id,
        status: TrialStatus::Ok,
        trace,
        evaluations,
        score,
        hard_failed,
        passed,
        retry_count,
        error,
    }
}

/// The weighted-average rule itself, independent of the `Trace`/
/// `TrialResult` wrapper it's normally folded into. Re-evaluation reapplies
/// this same rule to a (possibly narrower) set of evaluations, so both
/// paths must share the exact degenerate-scenario and hard-fail semantics.
///
/// Returns `(score, passed, hard_failed)`.
pub fn weighted_score(evaluations: &[EvalResult], pass_threshold: f64) -> (f64, bool, bool) {
    let hard_failed = evaluations.iter().any(|e| e.required && !e.passed);
    let total_weight: f64 = evaluations.iter().map(|e| e.weight).sum();

    let score = if hard_failed || total_weight <= 0.0 {
        0.0
    } else {
        evaluations.iter().map(|e| e.score * e.weight).sum::<f64>() / total_weight
    };

    let passed = !hard_failed && total_weight > 0.0 && score >= pass_threshold;
    (score, passed, hard_failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_types::{FinishReason, StopCondition, TokenUsage, Turn};

    fn empty_trace() -> Trace {
        Trace {
            id: TraceId::new("t1"),
            scenario_id: "s".into(),
            scenario_hash: "h".into(),
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            timestamp: chrono::Utc::now(),
            trial_index: 0,
            turns: vec![Turn {
                index: 1,
                request_messages: Vec::new(),
                assistant_content: String::new(),
                tool_calls: Vec::new(),
                tool_results: Vec::new(),
                usage: TokenUsage::default(),
                finish_reason: FinishReason::Stop,
                latency_ms: 0,
                cost_usd: None,
            }],
            stop_condition: StopCondition::Completed,
            finish_reason: FinishReason::Stop,
            total_usage: TokenUsage::default(),
            total_cost_usd: None,
            total_latency_ms: 0,
            error: None,
            retryable: false,
        }
    }

    fn score(evaluations: Vec<EvalResult>, pass_threshold: f64) -> TrialResult {
        score_trial(RunId::new("r1"), TraceId::new("t1"), 0, 0, empty_trace(), evaluations, pass_threshold)
    }

    #[test]
    fn no_assertions_is_degenerate_not_a_pass() {
        let result = score(Vec::new(), 0.8);
        assert_eq!(result.score, 0.0);
        assert!(!result.passed);
        assert!(!result.hard_failed);
    }

    #[test]
    fn all_zero_weight_is_also_degenerate() {
        let evaluations = vec![EvalResult::boolean("tool_called", true, 0.0, false, "ok")];
        let result = score(evaluations, 0.1);
        assert_eq!(result.score, 0.0);
        assert!(!result.passed);
    }

    #[test]
    fn weighted_average_respects_weights() {
        let evaluations = vec![
            EvalResult::boolean("tool_called", true, 3.0, false, "ok"),
            EvalResult::boolean("output_contains", false, 1.0, false, "missing"),
        ];
        let result = score(evaluations, 0.8);
        assert!((result.score - 0.75).abs() < 1e-9);
        assert!(!result.passed);
    }

    #[test]
    fn required_failure_forces_hard_fail_and_zero_score() {
        let evaluations = vec![
            EvalResult::boolean("tool_called", true, 1.0, false, "ok"),
            EvalResult::boolean("cost_limit", false, 1.0, true, "over budget"),
        ];
        let result = score(evaluations, 0.1);
        assert_eq!(result.score, 0.0);
        assert!(result.hard_failed);
        assert!(!result.passed);
    }

    #[test]
    fn pass_threshold_is_inclusive() {
        let evaluations = vec![EvalResult::boolean("tool_called", true, 1.0, false, "ok")];
        let result = score(evaluations, 1.0);
        assert!(result.passed);
    }

    proptest::proptest! {
        #[test]
        fn required_failure_always_zeroes_score(passed in proptest::collection::vec(proptest::bool::ANY, 1..8)) {
            let mut evaluations: Vec<EvalResult> = passed.iter().map(|&p| EvalResult::boolean("tool_called", p, 1.0, false, "x")).collect();
            evaluations.push(EvalResult::boolean("cost_limit", false, 1.0, true, "forced"));
            let result = score(evaluations, 0.5);
            proptest::prop_assert_eq!(result.score, 0.0);
            proptest::prop_assert!(result.hard_failed);
        }
    }
}
