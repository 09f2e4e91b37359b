//! Re-evaluator: reruns a recorded trace's assertions against a scenario,
//! detecting drift via content hash, and persists a `RevalResult` separate
//! from the run index it was drawn from.

use salvo_adapter::registry::AdapterDyn;
use salvo_eval::EvalContext;
use salvo_score::weighted_score;
use salvo_store::{FileStore, StoreError};
use salvo_types::{time_sortable_id, RecordMode, RecordedTrace, RevalId, Scenario, RevalResult};
use std::sync::Arc;
use thiserror::Error;

/// Options governing how strict a re-evaluation is.
#[derive(Debug, Clone, Default)]
pub struct RevalOptions {
    /// Refuse the whole re-evaluation if the scenario's content hash no
    /// longer matches the one the trace was recorded against.
    pub strict_scenario: bool,
    /// Skip (rather than refuse the whole run over) content-dependent
    /// assertions when the trace is `metadata_only`.
    pub allow_partial_reeval: bool,
}

/// Errors that stop a re-evaluation before it produces a result.
#[derive(Debug, Error)]
pub enum RevalError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("scenario has drifted: recorded against {recorded_hash}, re-evaluating against {current_hash}")]
    ScenarioDrift { recorded_hash: String, current_hash: String },
    #[error("trace was recorded metadata_only and contains content-dependent assertions; rerun with allow_partial_reeval to skip them")]
    ContentDependentAssertionsRefused,
}

/// Re-evaluate `recorded` against `scenario`, persisting and returning the
/// resulting `RevalResult`.
#[allow(clippy::too_many_arguments)]
pub async fn reevaluate(
    store: &FileStore,
    recorded: &RecordedTrace,
    scenario: &Scenario,
    opts: &RevalOptions,
    judge_adapter: Option<Arc<dyn AdapterDyn>>,
    default_judge_model: &str,
    judge_default_k: Option<u32>,
    judge_default_temperature: Option<f64>,
    judge_default_threshold: Option<f64>,
) -> Result<RevalResult, RevalError> {
    let current_hash = scenario.content_hash();
    if current_hash != recorded.trace.scenario_hash {
        if opts.strict_scenario {
            return Err(RevalError::ScenarioDrift { recorded_hash: recorded.trace.scenario_hash.clone(), current_hash });
        }
        tracing::warn!(recorded_hash = %recorded.trace.scenario_hash, current_hash = %current_hash, "re-evaluating against a scenario that has drifted since recording");
    }

    let has_content_dependent = scenario.assertions.iter().any(|a| a.is_content_dependent());
    if recorded.mode == RecordMode::MetadataOnly && has_content_dependent && !opts.allow_partial_reeval {
        return Err(RevalError::ContentDependentAssertionsRefused);
    }

    let ctx = EvalContext {
        trace: &recorded.trace,
        scenario_system_prompt: scenario.system_prompt.as_deref(),
        judge_adapter,
        default_judge_model: default_judge_model.to_string(),
        judge_default_k,
        judge_default_temperature,
        judge_default_threshold,
    };

    let mut eval_results = Vec::new();
    for (index, assertion) in scenario.assertions.iter().enumerate() {
        if recorded.mode == RecordMode::MetadataOnly && assertion.is_content_dependent() {
            tracing::info!(assertion_index = index, kind = assertion.type_name(), "skipped content-dependent assertion against a metadata_only recording");
            continue;
        }
        let mut result = salvo_eval::evaluate(&ctx, assertion).await;
        result.assertion_index = index;
        eval_results.push(result);
    }

    let (score, passed, _hard_failed) = weighted_score(&eval_results, scenario.pass_threshold);

    let reval = RevalResult {
        reval_id: RevalId::new(time_sortable_id()),
        original_trace_id: recorded.trace.id.clone(),
        scenario_hash_at_reeval: current_hash,
        eval_results,
        score,
        passed,
    };

    let path = store.reval_path(reval.reval_id.as_str());
    store.write_json(&path, &reval).await?;

    Ok(reval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_types::{Assertion, AssertionCommon, FinishReason, StopCondition, TokenUsage, TraceId, Trace, Turn};
    use std::collections::BTreeMap;

    fn scenario(assertions: Vec<Assertion>) -> Scenario {
        Scenario {
            id: "greet".into(),
            provider: "scripted".into(),
            model: "test-model".into(),
            system_prompt: None,
            initial_prompt: "hello".into(),
            turn_cap: 5,
            tools: Vec::new(),
            assertions,
            pass_threshold: 0.5,
            provider_extras: BTreeMap::new(),
        }
    }

    fn recorded(mode: RecordMode, scenario_hash: String) -> RecordedTrace {
        let trace = Trace {
            id: TraceId::new("t1"),
            scenario_id: "greet".into(),
            scenario_hash,
            provider: "scripted".into(),
            model: "test-model".into(),
            timestamp: chrono::Utc::now(),
            trial_index: 0,
            turns: vec![Turn {
                index: 1,
                request_messages: Vec::new(),
                assistant_content: "the answer is 42".into(),
                tool_calls: Vec::new(),
                tool_results: Vec::new(),
                usage: TokenUsage::default(),
                finish_reason: FinishReason::Stop,
                latency_ms: 5,
                cost_usd: None,
            }],
            stop_condition: StopCondition::Completed,
            finish_reason: FinishReason::Stop,
            total_usage: TokenUsage::default(),
            total_cost_usd: None,
            total_latency_ms: 5,
            error: None,
            retryable: false,
        };
        RecordedTrace::new(mode, trace)
    }

    #[tokio::test]
    async fn content_independent_assertion_reevaluates_from_a_metadata_only_recording() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let s = scenario(vec![Assertion::ToolCalled { common: AssertionCommon::default(), tool: "search".into() }]);
        let rt = recorded(RecordMode::MetadataOnly, s.content_hash());
        let result = reevaluate(&store, &rt, &s, &RevalOptions::default(), None, "gpt-4o-mini", None, None, None).await.unwrap();
        assert_eq!(result.eval_results.len(), 1);
    }

    #[tokio::test]
    async fn content_dependent_assertion_is_refused_by_default_on_metadata_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let s = scenario(vec![Assertion::OutputContains { common: AssertionCommon::default(), value: "42".into() }]);
        let rt = recorded(RecordMode::MetadataOnly, s.content_hash());
        let err = reevaluate(&store, &rt, &s, &RevalOptions::default(), None, "gpt-4o-mini", None, None, None).await.unwrap_err();
        assert!(matches!(err, RevalError::ContentDependentAssertionsRefused));
    }

    #[tokio::test]
    async fn allow_partial_reeval_skips_content_dependent_assertions() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let s = scenario(vec![
            Assertion::OutputContains { common: AssertionCommon::default(), value: "42".into() },
            Assertion::ToolCalled { common: AssertionCommon::default(), tool: "search".into() },
        ]);
        let rt = recorded(RecordMode::MetadataOnly, s.content_hash());
        let opts = RevalOptions { allow_partial_reeval: true, ..Default::default() };
        let result = reevaluate(&store, &rt, &s, &opts, None, "gpt-4o-mini", None, None, None).await.unwrap();
        assert_eq!(result.eval_results.len(), 1);
        assert_eq!(result.eval_results[0].assertion_index, 1);
    }

    #[tokio::test]
    async fn strict_scenario_refuses_drifted_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let s = scenario(vec![]);
        let rt = recorded(RecordMode::Full, "stale-hash".into());
        let opts = RevalOptions { strict_scenario: true, ..Default::default() };
        let err = reevaluate(&store, &rt, &s, &opts, None, "gpt-4o-mini", None, None, None).await.unwrap_err();
        assert!(matches!(err, RevalError::ScenarioDrift { .. }));
    }

    #[tokio::test]
    async fn non_strict_drift_proceeds_with_the_reeval_hash() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let s = scenario(vec![]);
        let rt = recorded(RecordMode::Full, "stale-hash".into());
        let result = reevaluate(&store, &rt, &s, &RevalOptions::default(), None, "gpt-4o-mini", None, None, None).await.unwrap();
        assert_eq!(result.scenario_hash_at_reeval, s.content_hash());
        assert_ne!(result.scenario_hash_at_reeval, "stale-hash");
    }
}
