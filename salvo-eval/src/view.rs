//! Flattens a `Trace` into a plain JSON value that `jmespath` assertions
//! query against.

use salvo_types::Trace;
use serde_json::json;

/// Build the flattened view used by `jmespath` and `output_contains`
/// assertions. Exactly four top-level keys:
///
/// - `response`: final assistant content plus why it stopped.
/// - `turns`: every turn, in order, with its own content/tool calls/finish
///   reason.
/// - `tool_calls`: a flat, cross-turn list of every tool call made.
/// - `metadata`: everything about the run that isn't part of the
///   conversation itself — provider, model, cost, latency, tokens, turn
///   count, and the trial's own finish reason.
pub fn flatten(trace: &Trace) -> serde_json::Value {
    let turns: Vec<serde_json::Value> = trace
        .turns
        .iter()
        .map(|t| {
            json!({
                "index": t.index,
                "content": t.assistant_content,
                "tool_calls": t.tool_calls.iter().map(|c| json!({"name": c.name, "arguments": c.arguments})).collect::<Vec<_>>(),
                "finish_reason": format!("{:?}", t.finish_reason),
                "latency_ms": t.latency_ms,
            })
        })
        .collect();

    let tool_calls: Vec<serde_json::Value> = trace
        .turns
        .iter()
        .flat_map(|t| t.tool_calls.iter())
        .map(|c| json!({"name": c.name, "arguments": c.arguments}))
        .collect();

    json!({
        "response": {
            "content": trace.final_output().unwrap_or_default(),
            "finish_reason": format!("{:?}", trace.finish_reason),
        },
        "turns": turns,
        "tool_calls": tool_calls,
        "metadata": {
            "provider": trace.provider,
            "model": trace.model,
            "stop_condition": format!("{:?}", trace.stop_condition),
            "finish_reason": format!("{:?}", trace.finish_reason),
            "turn_count": trace.turns.len(),
            "usage": {
                "input_tokens": trace.total_usage.input_tokens,
                "output_tokens": trace.total_usage.output_tokens,
            },
            "cost_usd": trace.total_cost_usd.map(|c| c.to_string()),
            "latency_ms": trace.total_latency_ms,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_types::{FinishReason, StopCondition, TokenUsage, TraceId, Turn};

    fn sample_trace() -> Trace {
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
                assistant_content: "done".into(),
                tool_calls: vec![salvo_types::ToolCall { id: "c1".into(), name: "search".into(), arguments: Default::default() }],
                tool_results: Vec::new(),
                usage: TokenUsage { input_tokens: 1, output_tokens: 1 },
                finish_reason: FinishReason::Stop,
                latency_ms: 10,
                cost_usd: None,
            }],
            stop_condition: StopCondition::Completed,
            finish_reason: FinishReason::Stop,
            total_usage: TokenUsage { input_tokens: 1, output_tokens: 1 },
            total_cost_usd: None,
            total_latency_ms: 10,
            error: None,
            retryable: false,
        }
    }

    #[test]
    fn flattens_final_output_and_tool_calls() {
        let trace = sample_trace();
        let view = flatten(&trace);
        assert_eq!(view["response"]["content"], "done");
        assert_eq!(view["response"]["finish_reason"], "Stop");
        assert_eq!(view["tool_calls"][0]["name"], "search");
    }

    #[test]
    fn exposes_exactly_the_four_top_level_keys() {
        let trace = sample_trace();
        let view = flatten(&trace);
        let mut keys: Vec<&str> = view.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["metadata", "response", "tool_calls", "turns"]);
    }

    #[test]
    fn metadata_turn_count_matches_the_worked_example() {
        let trace = sample_trace();
        let view = flatten(&trace);
        assert_eq!(view["metadata"]["turn_count"], 1);
        assert_eq!(view["metadata"]["model"], "gpt-4o-mini");
        assert_eq!(view["metadata"]["provider"], "openai");
        assert_eq!(view["turns"][0]["content"], "done");
        assert_eq!(view["turns"][0]["tool_calls"][0]["name"], "search");
    }
}
