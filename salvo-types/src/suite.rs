//! SuiteResult: cross-trial aggregation for a single scenario run.

use crate::trial::{TrialResult, TrialStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cross-trial verdict for a scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every trial passed.
    Pass,
    /// At least one trial failed but none hard-failed.
    Fail,
    /// At least one trial hard-failed (a required assertion failed).
    HardFail,
    /// Some trials passed and some failed (used when reporting is framed
    /// as a pass-rate rather than all-or-nothing).
    Partial,
    /// The run itself could not complete (adapter unreachable, scenario
    /// failed to load, etc.) — distinct from any trial's assertions failing.
    InfraError,
}

impl Verdict {
    /// Process exit code associated with this verdict.
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail | Verdict::Partial => 1,
            Verdict::HardFail => 2,
            Verdict::InfraError => 3,
        }
    }
}

/// One row of `SuiteResult::failure_ranking`: a single assertion's
/// aggregate failure profile across all trials in the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRankingEntry {
    /// Position of the assertion within the scenario's assertion list.
    pub assertion_index: usize,
    /// `Assertion::type_name()` of the failing assertion.
    pub assertion_type: String,
    /// Number of trials in which this assertion failed.
    pub failure_count: usize,
    /// Mean `weight * (1 - score)` across the failing trials — how much
    /// this assertion typically dragged the weighted average down.
    pub average_weight_lost: f64,
    /// `failure_count * average_weight_lost`, the sort key.
    pub rank_score: f64,
    /// Up to 3 sample explanations, in trial order, for quick diagnosis.
    pub sample_explanations: Vec<String>,
}

/// Result of running a scenario across N trials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    /// Id of the suite run this belongs to.
    pub run_id: crate::ids::RunId,
    /// Id of the scenario that was run.
    pub scenario_id: String,
    /// Per-trial results, in trial-index order.
    pub trials: Vec<TrialResult>,
    /// Overall verdict.
    pub verdict: Verdict,
    /// Fraction of trials that passed, in `[0, 1]`.
    pub pass_rate: f64,
    /// Mean score across all trials.
    pub mean_score: f64,
    /// Median latency across trials that weren't infra errors, in ms.
    pub latency_p50_ms: f64,
    /// 95th-percentile latency across trials that weren't infra errors.
    pub latency_p95_ms: f64,
    /// Sum of agent adapter cost across non-infra trials. `None` if any
    /// contributing trial's cost was unpriced (poisons, never zero).
    pub cost_total_usd: Option<Decimal>,
    /// Sum of judge LLM cost across every `judge` assertion evaluated in
    /// the run. `None` if any contributing vote's cost was unpriced.
    pub judge_cost_total_usd: Option<Decimal>,
    /// Failing assertions across the run, ranked by how much they cost the
    /// aggregate score, most damaging first.
    pub failure_ranking: Vec<FailureRankingEntry>,
}

impl SuiteResult {
    /// Aggregate a completed set of trial results into a suite verdict.
    ///
    /// `allow_infra` controls whether infra-errored trials are excluded
    /// from the pass-rate/mean-score/verdict base set (`true`) or counted
    /// as ordinary failures alongside scored trials (`false`, default
    /// behavior when the caller doesn't opt in).
    pub fn aggregate(run_id: crate::ids::RunId, scenario_id: impl Into<String>, trials: Vec<TrialResult>, allow_infra: bool) -> Self {
        let all_infra = !trials.is_empty() && trials.iter().all(|t| t.status == TrialStatus::InfraError);

        let base: Vec<&TrialResult> = if allow_infra {
            trials.iter().filter(|t| t.status == TrialStatus::Ok).collect()
        } else {
            trials.iter().collect()
        };

        let verdict = if all_infra && !allow_infra {
            Verdict::InfraError
        } else if base.is_empty() {
            Verdict::InfraError
        } else if base.iter().any(|t| t.hard_failed) {
            Verdict::HardFail
        } else if base.iter().all(|t| t.passed) {
            Verdict::Pass
        } else if base.iter().all(|t| !t.passed) {
            Verdict::Fail
        } else {
            Verdict::Partial
        };

        let n = base.len().max(1) as f64;
        let passed = base.iter().filter(|t| t.passed).count();
        let pass_rate = if base.is_empty() { 0.0 } else { passed as f64 / n };
        let mean_score = if base.is_empty() { 0.0 } else { base.iter().map(|t| t.score).sum::<f64>() / n };

        let successful_latencies: Vec<u64> = trials.iter().filter(|t| t.status == TrialStatus::Ok).map(|t| t.trace.total_latency_ms).collect();
        let latency_p50_ms = percentile(&successful_latencies, 0.5);
        let latency_p95_ms = percentile(&successful_latencies, 0.95);

        let mut cost_total_usd = Some(Decimal::ZERO);
        for t in trials.iter().filter(|t| t.status == TrialStatus::Ok) {
            cost_total_usd = match (cost_total_usd, t.trace.total_cost_usd) {
                (Some(acc), Some(c)) => Some(acc + c),
                _ => None,
            };
        }

        let mut judge_cost_total_usd = Some(Decimal::ZERO);
        for e in trials.iter().flat_map(|t| t.evaluations.iter()).filter(|e| e.assertion_type == "judge") {
            judge_cost_total_usd = match (judge_cost_total_usd, e.judge_cost_usd) {
                (Some(acc), Some(c)) => Some(acc + c),
                _ => None,
            };
        }

        let failure_ranking = failure_ranking(&trials);

        Self {
            run_id,
            scenario_id: scenario_id.into(),
            trials,
            verdict,
            pass_rate,
            mean_score,
            latency_p50_ms,
            latency_p95_ms,
            cost_total_usd,
            judge_cost_total_usd,
            failure_ranking,
        }
    }

    /// Build an infra-error suite result with no trials, used when the run
    /// could not even start (scenario load failure, adapter unreachable).
    pub fn infra_error(run_id: crate::ids::RunId, scenario_id: impl Into<String>) -> Self {
        Self {
            run_id,
            scenario_id: scenario_id.into(),
            trials: Vec::new(),
            verdict: Verdict::InfraError,
            pass_rate: 0.0,
            mean_score: 0.0,
            latency_p50_ms: 0.0,
            latency_p95_ms: 0.0,
            cost_total_usd: Some(Decimal::ZERO),
            judge_cost_total_usd: Some(Decimal::ZERO),
            failure_ranking: Vec::new(),
        }
    }
}

/// Linear-interpolated percentile over a copy of `values`. With fewer than
/// two samples the single value (or 0.0) stands, per the "scalar with <2
/// trials" boundary case.
fn percentile(values: &[u64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let rank = p * (sorted.len() as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo] as f64
    } else {
        let frac = rank - lo as f64;
        sorted[lo] as f64 * (1.0 - frac) + sorted[hi] as f64 * frac
    }
}

fn failure_ranking(trials: &[TrialResult]) -> Vec<FailureRankingEntry> {
    use std::collections::BTreeMap;

    struct Acc {
        assertion_type: String,
        count: usize,
        weight_lost_sum: f64,
        samples: Vec<String>,
    }

    let mut groups: BTreeMap<usize, Acc> = BTreeMap::new();
    for trial in trials {
        for e in trial.evaluations.iter().filter(|e| !e.passed) {
            let acc = groups.entry(e.assertion_index).or_insert_with(|| Acc {
                assertion_type: e.assertion_type.clone(),
                count: 0,
                weight_lost_sum: 0.0,
                samples: Vec::new(),
            });
            acc.count += 1;
            acc.weight_lost_sum += e.weight * (1.0 - e.score);
            if acc.samples.len() < 3 {
                acc.samples.push(e.explanation.clone());
            }
        }
    }

    let mut rows: Vec<FailureRankingEntry> = groups
        .into_iter()
        .map(|(assertion_index, acc)| {
            let average_weight_lost = acc.weight_lost_sum / acc.count as f64;
            FailureRankingEntry {
                assertion_index,
                assertion_type: acc.assertion_type,
                failure_count: acc.count,
                average_weight_lost,
                rank_score: acc.count as f64 * average_weight_lost,
                sample_explanations: acc.samples,
            }
        })
        .collect();

    rows.sort_by(|a, b| b.rank_score.partial_cmp(&a.rank_score).unwrap_or(std::cmp::Ordering::Equal));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{RunId, TraceId};
    use crate::message::TokenUsage;
    use crate::trace::{StopCondition, Trace};
    use crate::trial::TrialStatus;
    use crate::EvalResult;

    fn trial(score: f64, passed: bool, hard_failed: bool, latency_ms: u64, evaluations: Vec<EvalResult>) -> TrialResult {
        TrialResult {
            trial_index: 0,
            run_id: RunId::new("r1"),
            trace_id: TraceId::new("t"),
            status: TrialStatus::Ok,
            trace: Trace {
                id: TraceId::new("t"),
                scenario_id: "greet".into(),
                scenario_hash: "h".into(),
                provider: "openai".into(),
                model: "gpt-4o-mini".into(),
                timestamp: chrono::Utc::now(),
                trial_index: 0,
                turns: Vec::new(),
                stop_condition: StopCondition::Completed,
                finish_reason: crate::message::FinishReason::Stop,
                total_usage: TokenUsage::default(),
                total_cost_usd: None,
                total_latency_ms: latency_ms,
                error: None,
                retryable: false,
            },
            evaluations,
            score,
            hard_failed,
            passed,
            retry_count: 0,
            error: None,
        }
    }

    #[test]
    fn all_pass_yields_pass_verdict() {
        let s = SuiteResult::aggregate(RunId::new("r1"), "greet", vec![trial(1.0, true, false, 100, vec![]), trial(1.0, true, false, 200, vec![])], false);
        assert_eq!(s.verdict, Verdict::Pass);
        assert_eq!(s.pass_rate, 1.0);
        assert_eq!(s.verdict.exit_code(), 0);
        assert_eq!(s.latency_p50_ms, 150.0);
    }

    #[test]
    fn any_hard_fail_dominates() {
        let s = SuiteResult::aggregate(RunId::new("r1"), "greet", vec![trial(1.0, true, false, 0, vec![]), trial(0.0, false, true, 0, vec![])], false);
        assert_eq!(s.verdict, Verdict::HardFail);
        assert_eq!(s.verdict.exit_code(), 2);
    }

    #[test]
    fn mixed_without_hard_fail_is_partial() {
        let s = SuiteResult::aggregate(RunId::new("r1"), "greet", vec![trial(1.0, true, false, 0, vec![]), trial(0.3, false, false, 0, vec![])], false);
        assert_eq!(s.verdict, Verdict::Partial);
        assert_eq!(s.verdict.exit_code(), 1);
    }

    #[test]
    fn all_fail_is_fail() {
        let s = SuiteResult::aggregate(RunId::new("r1"), "greet", vec![trial(0.0, false, false, 0, vec![])], false);
        assert_eq!(s.verdict, Verdict::Fail);
        assert_eq!(s.verdict.exit_code(), 1);
    }

    #[test]
    fn infra_error_has_no_trials_and_exit_code_three() {
        let s = SuiteResult::infra_error(RunId::new("r1"), "greet");
        assert_eq!(s.verdict, Verdict::InfraError);
        assert_eq!(s.verdict.exit_code(), 3);
        assert!(s.trials.is_empty());
    }

    #[test]
    fn allow_infra_excludes_infra_trials_from_the_base_set() {
        let ok_trial = trial(1.0, true, false, 0, vec![]);
        let infra = TrialResult::infra_error(RunId::new("r1"), TraceId::new("t2"), 1, "greet", "h", "openai", "gpt-4o-mini", 0, "boom");
        let s = SuiteResult::aggregate(RunId::new("r1"), "greet", vec![ok_trial, infra], true);
        assert_eq!(s.verdict, Verdict::Pass);
        assert_eq!(s.pass_rate, 1.0);
        assert_eq!(s.trials.len(), 2);
    }

    #[test]
    fn failure_ranking_orders_by_frequency_times_weight_lost() {
        let failing_a = EvalResult { assertion_index: 0, assertion_type: "tool_called".into(), passed: false, weight: 2.0, required: false, score: 0.0, explanation: "missed".into(), judge_detail: Default::default(), judge_cost_usd: None };
        let failing_b = EvalResult { assertion_index: 1, assertion_type: "output_contains".into(), passed: false, weight: 1.0, required: false, score: 0.0, explanation: "missed".into(), judge_detail: Default::default(), judge_cost_usd: None };
        let t1 = trial(0.0, false, false, 0, vec![failing_a.clone(), failing_b.clone()]);
        let t2 = trial(0.0, false, false, 0, vec![failing_a]);
        let s = SuiteResult::aggregate(RunId::new("r1"), "greet", vec![t1, t2], false);
        assert_eq!(s.failure_ranking[0].assertion_index, 0);
        assert_eq!(s.failure_ranking[0].failure_count, 2);
        assert_eq!(s.failure_ranking[1].assertion_index, 1);
    }
}
