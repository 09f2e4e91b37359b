//! Scenario runner: the multi-turn agent loop.
//!
//! Sends the initial prompt, resolves any tool calls the model makes
//! against the scenario's mock registry, feeds the results back, and keeps
//! going until the model stops, the turn cap is hit, or something goes
//! wrong. Produces a `Trace` either way — a trial that errors out still
//! gets scored, it just scores against whatever assertions survive.

use salvo_adapter::registry::AdapterDyn;
use salvo_adapter::cost::estimate_cost;
use salvo_tool::ToolMockRegistry;
use salvo_types::{
    AdapterConfig, FinishReason, Message, Role, Scenario, StopCondition, Trace, TraceId, Turn,
};
use std::sync::Arc;
use std::time::Instant;

/// Structured progress notifications emitted while a trial runs, mirroring
/// the turn/tool/trial boundaries the loop itself already tracks. Pure
/// observability — nothing here feeds back into scoring or assertions.
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    /// A new turn began; `turn` is the 1-based index about to be sent.
    TurnStarted { trial_index: u32, turn: u32 },
    /// A tool call in the current turn was resolved against the mock
    /// registry (or found to have no mock, in which case `resolved` is
    /// `false`).
    ToolResolved { trial_index: u32, turn: u32, tool: String, resolved: bool },
    /// The trial reached a terminal `StopCondition`.
    TrialFinished { trial_index: u32, stop_condition: StopCondition },
}

pub type EventSender = tokio::sync::mpsc::UnboundedSender<RunnerEvent>;

fn emit(events: Option<&EventSender>, event: RunnerEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

/// Run a single trial of `scenario` against `adapter`, producing a full
/// execution trace.
///
/// `trace_id`/`trial_index` are supplied by the caller (the orchestrator)
/// rather than generated here, so that trial numbering stays under the
/// orchestrator's control.
pub async fn run_trial(scenario: &Scenario, adapter: Arc<dyn AdapterDyn>, trace_id: TraceId, trial_index: u32) -> Trace {
    run_trial_with_events(scenario, adapter, trace_id, trial_index, None).await
}

/// Same as [`run_trial`], but reports [`RunnerEvent`]s to `events` as the
/// loop progresses. `events` is `None` for callers (most tests, and
/// `run_trial` itself) that don't care to observe progress.
pub async fn run_trial_with_events(scenario: &Scenario, adapter: Arc<dyn AdapterDyn>, trace_id: TraceId, trial_index: u32, events: Option<EventSender>) -> Trace {
    let events = events.as_ref();
    let registry = ToolMockRegistry::from_definitions(&scenario.tools);
    let mut messages = Vec::new();
    if let Some(system) = &scenario.system_prompt {
        messages.push(Message::text(Role::System, system.clone()));
    }
    messages.push(Message::text(Role::User, scenario.initial_prompt.clone()));

    let config = AdapterConfig {
        model: scenario.model.clone(),
        extras: scenario.provider_extras.clone(),
        ..Default::default()
    };

    let mut turns = Vec::new();
    let mut stop_condition = StopCondition::Completed;
    let mut finish_reason = FinishReason::Stop;
    let mut error = None;
    let mut retryable = false;

    for turn_index in 1..=scenario.turn_cap {
        emit(events, RunnerEvent::TurnStarted { trial_index, turn: turn_index });
        let call_start = Instant::now();
        let result = adapter.send_turn_boxed(&messages, &scenario.tools, &config).await;
        let latency_ms = call_start.elapsed().as_millis() as u64;

        let turn_result = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(trial = trial_index, turn = turn_index, error = %e, "adapter call failed");
                stop_condition = StopCondition::AdapterError;
                finish_reason = FinishReason::Error;
                retryable = e.is_retryable();
                error = Some(e.to_string());
                break;
            }
        };

        let cost_usd = estimate_cost(&config.model, turn_result.usage);

        if matches!(turn_result.finish_reason, FinishReason::Length | FinishReason::ContentFilter) {
            let reason = if turn_result.finish_reason == FinishReason::Length { "max_tokens reached" } else { "content filtered" };
            turns.push(Turn {
                index: turn_index,
                request_messages: messages.clone(),
                assistant_content: turn_result.assistant_content.clone(),
                tool_calls: turn_result.tool_calls.clone(),
                tool_results: Vec::new(),
                usage: turn_result.usage,
                finish_reason: turn_result.finish_reason,
                latency_ms,
                cost_usd,
            });
            stop_condition = StopCondition::AdapterError;
            finish_reason = turn_result.finish_reason;
            error = Some(reason.to_string());
            break;
        }

        messages.push(Message {
            role: Role::Assistant,
            content: turn_result.assistant_content.clone(),
            tool_calls: turn_result.tool_calls.clone(),
            tool_call_id: None,
            tool_name: None,
        });

        if matches!(turn_result.finish_reason, FinishReason::Stop) {
            turns.push(Turn {
                index: turn_index,
                request_messages: messages.clone(),
                assistant_content: turn_result.assistant_content.clone(),
                tool_calls: Vec::new(),
                tool_results: Vec::new(),
                usage: turn_result.usage,
                finish_reason: turn_result.finish_reason,
                latency_ms,
                cost_usd,
            });
            stop_condition = StopCondition::Completed;
            finish_reason = FinishReason::Stop;
            break;
        }

        finish_reason = turn_result.finish_reason;
        let mut tool_results = Vec::new();
        let mut missing_tool = None;
        for call in &turn_result.tool_calls {
            match registry.resolve(&call.name) {
                Ok(payload) => {
                    let content = serde_json::to_string(payload).unwrap_or_default();
                    let msg = Message::tool_result(call.id.clone(), call.name.clone(), content);
                    messages.push(msg.clone());
                    tool_results.push(msg);
                    emit(events, RunnerEvent::ToolResolved { trial_index, turn: turn_index, tool: call.name.clone(), resolved: true });
                }
                Err(_) => {
                    missing_tool = Some(call.name.clone());
                    emit(events, RunnerEvent::ToolResolved { trial_index, turn: turn_index, tool: call.name.clone(), resolved: false });
                    break;
                }
            }
        }

        turns.push(Turn {
            index: turn_index,
            request_messages: messages.clone(),
            assistant_content: turn_result.assistant_content,
            tool_calls: turn_result.tool_calls,
            tool_results,
            usage: turn_result.usage,
            finish_reason: turn_result.finish_reason,
            latency_ms,
            cost_usd,
        });

        if let Some(tool_name) = missing_tool {
            tracing::warn!(trial = trial_index, tool = %tool_name, "tool call had no mock registered");
            stop_condition = StopCondition::ToolMockMissing;
            error = Some(format!("no mock registered for tool '{tool_name}'"));
            break;
        }

        if turn_index == scenario.turn_cap {
            stop_condition = StopCondition::TurnCapExceeded;
        }
    }

    if stop_condition == StopCondition::TurnCapExceeded {
        finish_reason = FinishReason::Length;
        if let Some(last) = turns.last_mut() {
            last.finish_reason = FinishReason::Length;
        }
    }

    emit(events, RunnerEvent::TrialFinished { trial_index, stop_condition });

    let mut trace = Trace {
        id: trace_id,
        scenario_id: scenario.id.clone(),
        scenario_hash: scenario.content_hash(),
        provider: scenario.provider.clone(),
        model: scenario.model.clone(),
        timestamp: chrono::Utc::now(),
        trial_index,
        turns,
        stop_condition,
        finish_reason,
        total_usage: Default::default(),
        total_cost_usd: None,
        total_latency_ms: 0,
        error,
        retryable,
    };
    trace.recompute_totals();
    trace
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_adapter::{Adapter, AdapterError};
    use salvo_types::{AdapterTurnResult, ToolDefinition, TokenUsage};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedAdapter {
        responses: Mutex<VecDeque<Result<AdapterTurnResult, AdapterError>>>,
    }

    impl ScriptedAdapter {
        fn new(responses: Vec<Result<AdapterTurnResult, AdapterError>>) -> Arc<dyn AdapterDyn> {
            Arc::new(Self { responses: Mutex::new(responses.into()) })
        }
    }

    impl Adapter for ScriptedAdapter {
        async fn send_turn(&self, _messages: &[Message], _tools: &[ToolDefinition], _config: &AdapterConfig) -> Result<AdapterTurnResult, AdapterError> {
            self.responses.lock().unwrap().pop_front().expect("no more scripted responses")
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn scenario_with_tools(tools: Vec<ToolDefinition>, turn_cap: u32) -> Scenario {
        Scenario {
            id: "s1".into(),
            provider: "scripted".into(),
            model: "test-model".into(),
            system_prompt: None,
            initial_prompt: "hello".into(),
            turn_cap,
            tools,
            assertions: Vec::new(),
            pass_threshold: 0.8,
            provider_extras: Default::default(),
        }
    }

    fn stop_result(content: &str) -> Result<AdapterTurnResult, AdapterError> {
        Ok(AdapterTurnResult {
            assistant_content: content.into(),
            tool_calls: Vec::new(),
            usage: TokenUsage { input_tokens: 5, output_tokens: 5 },
            finish_reason: FinishReason::Stop,
        })
    }

    #[tokio::test]
    async fn completes_on_first_stop() {
        let adapter = ScriptedAdapter::new(vec![stop_result("done")]);
        let scenario = scenario_with_tools(Vec::new(), 10);
        let trace = run_trial(&scenario, adapter, TraceId::new("t1"), 0).await;
        assert_eq!(trace.stop_condition, StopCondition::Completed);
        assert_eq!(trace.final_output(), Some("done"));
        assert_eq!(trace.turns.len(), 1);
    }

    #[tokio::test]
    async fn resolves_tool_call_then_completes() {
        let tool = ToolDefinition {
            name: "search".into(),
            description: "".into(),
            input_schema: serde_json::json!({}),
            mock_response: serde_json::json!({"ok": true}),
        };
        let tool_use = Ok(AdapterTurnResult {
            assistant_content: String::new(),
            tool_calls: vec![salvo_types::ToolCall { id: "c1".into(), name: "search".into(), arguments: Default::default() }],
            usage: TokenUsage { input_tokens: 5, output_tokens: 5 },
            finish_reason: FinishReason::ToolUse,
        });
        let adapter = ScriptedAdapter::new(vec![tool_use, stop_result("found it")]);
        let scenario = scenario_with_tools(vec![tool], 10);
        let trace = run_trial(&scenario, adapter, TraceId::new("t1"), 0).await;
        assert_eq!(trace.stop_condition, StopCondition::Completed);
        assert_eq!(trace.tool_call_sequence(), vec!["search"]);
        assert_eq!(trace.turns.len(), 2);
    }

    #[tokio::test]
    async fn missing_tool_mock_stops_the_trial() {
        let tool_use = Ok(AdapterTurnResult {
            assistant_content: String::new(),
            tool_calls: vec![salvo_types::ToolCall { id: "c1".into(), name: "unmocked".into(), arguments: Default::default() }],
            usage: TokenUsage::default(),
            finish_reason: FinishReason::ToolUse,
        });
        let adapter = ScriptedAdapter::new(vec![tool_use]);
        let scenario = scenario_with_tools(Vec::new(), 10);
        let trace = run_trial(&scenario, adapter, TraceId::new("t1"), 0).await;
        assert_eq!(trace.stop_condition, StopCondition::ToolMockMissing);
        assert!(trace.error.is_some());
    }

    #[tokio::test]
    async fn turn_cap_is_enforced() {
        let tool = ToolDefinition {
            name: "loop_tool".into(),
            description: "".into(),
            input_schema: serde_json::json!({}),
            mock_response: serde_json::json!({}),
        };
        let always_tool_use = || {
            Ok(AdapterTurnResult {
                assistant_content: String::new(),
                tool_calls: vec![salvo_types::ToolCall { id: "c".into(), name: "loop_tool".into(), arguments: Default::default() }],
                usage: TokenUsage::default(),
                finish_reason: FinishReason::ToolUse,
            })
        };
        let adapter = ScriptedAdapter::new(vec![always_tool_use(), always_tool_use()]);
        let scenario = scenario_with_tools(vec![tool], 2);
        let trace = run_trial(&scenario, adapter, TraceId::new("t1"), 0).await;
        assert_eq!(trace.stop_condition, StopCondition::TurnCapExceeded);
        assert_eq!(trace.turns.len(), 2);
        assert_eq!(trace.finish_reason, FinishReason::Length);
        assert_eq!(trace.turns.last().unwrap().finish_reason, FinishReason::Length);
    }

    #[tokio::test]
    async fn adapter_error_is_captured_not_propagated() {
        let adapter = ScriptedAdapter::new(vec![Err(AdapterError::RequestFailed("boom".into()))]);
        let scenario = scenario_with_tools(Vec::new(), 10);
        let trace = run_trial(&scenario, adapter, TraceId::new("t1"), 0).await;
        assert_eq!(trace.stop_condition, StopCondition::AdapterError);
        assert_eq!(trace.error.as_deref(), Some("request failed: boom"));
    }
}
