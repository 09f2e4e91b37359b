//! `tool_sequence`, `tool_called`, and `output_contains` assertion
//! evaluation. The latter two are sugar over the same comparison logic.

use salvo_types::{EvalResult, SequenceMode, Trace};

/// Evaluate a `tool_sequence` assertion against the trace's flat, in-order
/// tool-call names.
pub fn evaluate_sequence(trace: &Trace, expected: &[String], mode: SequenceMode, weight: f64, required: bool) -> EvalResult {
    let observed: Vec<&str> = trace.tool_call_sequence();
    let passed = match mode {
        SequenceMode::Exact => observed.len() == expected.len() && observed.iter().zip(expected).all(|(o, e)| o == e),
        SequenceMode::InOrder => is_subsequence(expected, &observed),
        SequenceMode::AnyOrder => {
            let mut remaining: Vec<&str> = observed.clone();
            expected.iter().all(|e| {
                if let Some(pos) = remaining.iter().position(|o| o == e) {
                    remaining.remove(pos);
                    true
                } else {
                    false
                }
            })
        }
    };

    let explanation = format!("expected sequence {expected:?} ({mode:?}), observed {observed:?}");
    EvalResult::boolean("tool_sequence", passed, weight, required, explanation)
}

fn is_subsequence(expected: &[String], observed: &[&str]) -> bool {
    let mut cursor = 0;
    for want in expected {
        match observed[cursor..].iter().position(|o| o == want) {
            Some(offset) => cursor += offset + 1,
            None => return false,
        }
    }
    true
}

/// Evaluate a `tool_called` assertion: sugar for "this tool was invoked at
/// least once, in any order, among possibly other calls".
pub fn evaluate_tool_called(trace: &Trace, tool: &str, weight: f64, required: bool) -> EvalResult {
    let observed = trace.tool_call_sequence();
    let passed = observed.contains(&tool);
    EvalResult::boolean("tool_called", passed, weight, required, format!("expected '{tool}' to be called, observed {observed:?}"))
}

/// Evaluate an `output_contains` assertion: sugar for a `jmespath`
/// `response.content contains value` check.
pub fn evaluate_output_contains(trace: &Trace, needle: &str, weight: f64, required: bool) -> EvalResult {
    let output = trace.final_output().unwrap_or_default();
    let passed = output.contains(needle);
    EvalResult::boolean("output_contains", passed, weight, required, format!("expected output to contain '{needle}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_types::{FinishReason, StopCondition, TokenUsage, TraceId, Turn};

    fn trace_with_calls(names: &[&str]) -> Trace {
        let turns = names
            .iter()
            .enumerate()
            .map(|(i, name)| Turn {
                index: i as u32 + 1,
                request_messages: Vec::new(),
                assistant_content: String::new(),
                tool_calls: vec![salvo_types::ToolCall { id: format!("c{i}"), name: name.to_string(), arguments: Default::default() }],
                tool_results: Vec::new(),
                usage: TokenUsage::default(),
                finish_reason: FinishReason::ToolUse,
                latency_ms: 0,
                cost_usd: None,
            })
            .collect();
        Trace {
            id: TraceId::new("t1"),
            scenario_id: "s".into(),
            scenario_hash: "h".into(),
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            timestamp: chrono::Utc::now(),
            trial_index: 0,
            turns,
            stop_condition: StopCondition::Completed,
            finish_reason: FinishReason::Stop,
            total_usage: TokenUsage::default(),
            total_cost_usd: None,
            total_latency_ms: 0,
            error: None,
            retryable: false,
        }
    }

    #[test]
    fn exact_mode_requires_identical_sequence() {
        let trace = trace_with_calls(&["search", "fetch"]);
        let expected = vec!["search".to_string(), "fetch".to_string()];
        assert!(evaluate_sequence(&trace, &expected, SequenceMode::Exact, 1.0, false).passed);
        let wrong = vec!["fetch".to_string(), "search".to_string()];
        assert!(!evaluate_sequence(&trace, &wrong, SequenceMode::Exact, 1.0, false).passed);
    }

    #[test]
    fn in_order_mode_allows_extra_calls() {
        let trace = trace_with_calls(&["search", "log", "fetch"]);
        let expected = vec!["search".to_string(), "fetch".to_string()];
        assert!(evaluate_sequence(&trace, &expected, SequenceMode::InOrder, 1.0, false).passed);
        let reversed = vec!["fetch".to_string(), "search".to_string()];
        assert!(!evaluate_sequence(&trace, &reversed, SequenceMode::InOrder, 1.0, false).passed);
    }

    #[test]
    fn any_order_mode_ignores_order() {
        let trace = trace_with_calls(&["fetch", "search"]);
        let expected = vec!["search".to_string(), "fetch".to_string()];
        assert!(evaluate_sequence(&trace, &expected, SequenceMode::AnyOrder, 1.0, false).passed);
    }

    #[test]
    fn tool_called_checks_membership() {
        let trace = trace_with_calls(&["search"]);
        assert!(evaluate_tool_called(&trace, "search", 1.0, false).passed);
        assert!(!evaluate_tool_called(&trace, "fetch", 1.0, false).passed);
    }
}
