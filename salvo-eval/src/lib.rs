//! Assertion evaluators for Salvo.

pub mod jmespath_eval;
pub mod judge;
pub mod limits;
pub mod tool_sequence;
pub mod view;

use salvo_adapter::registry::AdapterDyn;
use salvo_types::assertion::{DEFAULT_JUDGE_K, DEFAULT_JUDGE_TEMPERATURE, DEFAULT_JUDGE_THRESHOLD};
use salvo_types::{Assertion, EvalResult, Trace};
use std::sync::Arc;

/// Everything the evaluator registry needs beyond the assertion itself:
/// the trace being graded, the scenario's system prompt (for judge context),
/// and an adapter to use for `judge` assertions.
///
/// The `judge_default_*` fields are the project-config tier of the
/// assertion > project > hardcoded merge: a `judge` assertion that leaves
/// `k`/`temperature`/`threshold` unset falls back to these before the
/// hardcoded constants in `salvo_types::assertion`.
pub struct EvalContext<'a> {
    /// The trial's full execution trace.
    pub trace: &'a Trace,
    /// The scenario's system prompt, if any.
    pub scenario_system_prompt: Option<&'a str>,
    /// Adapter used to run judge votes. `None` if no `judge` assertions are
    /// present, in which case evaluating one is treated as a config error.
    pub judge_adapter: Option<Arc<dyn AdapterDyn>>,
    /// Model used for `judge` assertions that don't override it.
    pub default_judge_model: String,
    /// Project-level default vote count for `judge` assertions that don't
    /// set their own `k`.
    pub judge_default_k: Option<u32>,
    /// Project-level default sampling temperature for `judge` assertions
    /// that don't set their own `temperature`.
    pub judge_default_temperature: Option<f64>,
    /// Project-level default pass threshold for `judge` assertions that
    /// don't set their own `threshold`.
    pub judge_default_threshold: Option<f64>,
}

impl<'a> EvalContext<'a> {
    /// Resolve a `judge` assertion's vote count: assertion override, then
    /// the project default, then the hardcoded constant. Warns if the
    /// resolved value is 1 — a single vote has no consensus to take a
    /// median over, which usually means a misconfigured project default
    /// or assertion.
    fn resolve_judge_k(&self, assertion_k: Option<u32>) -> u32 {
        let k = assertion_k.or(self.judge_default_k).unwrap_or(DEFAULT_JUDGE_K);
        if k == 1 {
            tracing::warn!("judge assertion resolved to k=1; a single vote has no median to take consensus over");
        }
        k
    }

    fn resolve_judge_temperature(&self, assertion_temperature: Option<f64>) -> f64 {
        assertion_temperature.or(self.judge_default_temperature).unwrap_or(DEFAULT_JUDGE_TEMPERATURE)
    }

    fn resolve_judge_threshold(&self, assertion_threshold: Option<f64>) -> f64 {
        assertion_threshold.or(self.judge_default_threshold).unwrap_or(DEFAULT_JUDGE_THRESHOLD)
    }
}

/// Evaluate one assertion against the context's trace.
pub async fn evaluate(ctx: &EvalContext<'_>, assertion: &Assertion) -> EvalResult {
    match assertion {
        Assertion::Jmespath { common, expression, operator, value } => {
            let view = view::flatten(ctx.trace);
            jmespath_eval::evaluate(&view, expression, *operator, value, common.weight, common.required)
        }
        Assertion::ToolSequence { common, sequence, mode } => tool_sequence::evaluate_sequence(ctx.trace, sequence, *mode, common.weight, common.required),
        Assertion::ToolCalled { common, tool } => tool_sequence::evaluate_tool_called(ctx.trace, tool, common.weight, common.required),
        Assertion::OutputContains { common, value } => tool_sequence::evaluate_output_contains(ctx.trace, value, common.weight, common.required),
        Assertion::CostLimit { common, max_usd } => limits::evaluate_cost_limit(ctx.trace, *max_usd, common.weight, common.required),
        Assertion::LatencyLimit { common, max_seconds } => limits::evaluate_latency_limit(ctx.trace, *max_seconds, common.weight, common.required),
        Assertion::Judge { common, criteria, judge_model, k, include_system_prompt, custom_prompt, temperature, threshold } => {
            let Some(adapter) = ctx.judge_adapter.as_ref() else {
                return EvalResult::boolean("judge", false, common.weight, common.required, "no judge adapter configured for this run".to_string());
            };
            judge::evaluate_judge(
                ctx.trace,
                criteria,
                judge_model.as_deref(),
                &ctx.default_judge_model,
                ctx.resolve_judge_k(*k),
                *include_system_prompt,
                ctx.scenario_system_prompt,
                custom_prompt.as_deref(),
                ctx.resolve_judge_temperature(*temperature),
                ctx.resolve_judge_threshold(*threshold),
                common.weight,
                common.required,
                adapter,
            )
            .await
        }
    }
}

/// Evaluate every assertion on a scenario, in declared order.
pub async fn evaluate_all(ctx: &EvalContext<'_>, assertions: &[Assertion]) -> Vec<EvalResult> {
    let mut results = Vec::with_capacity(assertions.len());
    for (index, assertion) in assertions.iter().enumerate() {
        let mut result = evaluate(ctx, assertion).await;
        result.assertion_index = index;
        results.push(result);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_types::{AssertionCommon, FinishReason, StopCondition, TokenUsage, TraceId, Turn};

    fn completed_trace() -> Trace {
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
        }
    }

    fn ctx(trace: &Trace) -> EvalContext<'_> {
        EvalContext {
            trace,
            scenario_system_prompt: None,
            judge_adapter: None,
            default_judge_model: "gpt-4o-mini".into(),
            judge_default_k: None,
            judge_default_temperature: None,
            judge_default_threshold: None,
        }
    }

    #[tokio::test]
    async fn evaluates_output_contains() {
        let trace = completed_trace();
        let assertion = Assertion::OutputContains { common: AssertionCommon::default(), value: "42".into() };
        let result = evaluate(&ctx(&trace), &assertion).await;
        assert!(result.passed);
    }

    #[tokio::test]
    async fn judge_without_adapter_fails_cleanly() {
        let trace = completed_trace();
        let assertion = Assertion::Judge {
            common: AssertionCommon::default(),
            criteria: vec![],
            judge_model: None,
            k: Some(3),
            include_system_prompt: false,
            custom_prompt: None,
            temperature: None,
            threshold: Some(0.8),
        };
        let result = evaluate(&ctx(&trace), &assertion).await;
        assert!(!result.passed);
    }

    #[test]
    fn resolve_judge_k_prefers_assertion_then_project_then_hardcoded() {
        let trace = completed_trace();
        let mut c = ctx(&trace);
        assert_eq!(c.resolve_judge_k(None), DEFAULT_JUDGE_K);
        c.judge_default_k = Some(5);
        assert_eq!(c.resolve_judge_k(None), 5);
        assert_eq!(c.resolve_judge_k(Some(7)), 7);
    }
}
