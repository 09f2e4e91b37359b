//! Trace: the full record of a single trial's execution.

use crate::message::{FinishReason, Message, TokenUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One adapter round-trip within a trial: the outbound messages sent and
/// the turn result that came back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// 1-based turn index within the trial.
    pub index: u32,
    /// Full message history sent to the adapter for this turn.
    pub request_messages: Vec<Message>,
    /// Assistant text produced this turn.
    pub assistant_content: String,
    /// Tool calls the model requested this turn.
    pub tool_calls: Vec<crate::message::ToolCall>,
    /// Tool-result messages produced by resolving `tool_calls` against the
    /// mock registry, in call order.
    pub tool_results: Vec<Message>,
    /// Token usage for this turn's adapter call.
    pub usage: TokenUsage,
    /// Why the model stopped this turn.
    pub finish_reason: FinishReason,
    /// Wall-clock latency of the adapter call, in milliseconds.
    pub latency_ms: u64,
    /// Estimated cost of this turn in USD, or `None` if the model/pricing
    /// table doesn't know how to price it. Never synthesized as zero.
    pub cost_usd: Option<rust_decimal::Decimal>,
}

/// Why a trial's turn loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    /// The model produced a final answer with no further tool calls.
    Completed,
    /// `turn_cap` was reached before the model stopped requesting tools.
    TurnCapExceeded,
    /// A requested tool had no matching entry in the scenario's tool list.
    ToolMockMissing,
    /// The adapter call failed in a way that ended the trial.
    AdapterError,
}

fn default_trace_finish_reason() -> FinishReason {
    FinishReason::Stop
}

/// Full execution record of a single trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// Unique id for this trace.
    pub id: crate::ids::TraceId,
    /// Id of the scenario this trial executed.
    pub scenario_id: String,
    /// Content hash of the scenario at the time of recording, used to
    /// detect scenario drift on replay/re-evaluation.
    pub scenario_hash: String,
    /// Adapter provider this trial dispatched through (e.g. `"openai"`).
    #[serde(default)]
    pub provider: String,
    /// Model identifier this trial dispatched against.
    #[serde(default)]
    pub model: String,
    /// Wall-clock instant the trace was finalized.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// 0-based trial index within the suite run.
    pub trial_index: u32,
    /// Every turn executed, in order.
    pub turns: Vec<Turn>,
    /// Why the loop stopped.
    pub stop_condition: StopCondition,
    /// Why the trial's last turn stopped generating. Forced to `Length`
    /// when `stop_condition == TurnCapExceeded`, regardless of what the
    /// adapter itself reported for that turn.
    #[serde(default = "default_trace_finish_reason")]
    pub finish_reason: FinishReason,
    /// Total token usage across all turns.
    pub total_usage: TokenUsage,
    /// Total estimated cost across all turns. `None` if any turn's cost was
    /// unknown (unknown never collapses to zero; it poisons the total).
    pub total_cost_usd: Option<rust_decimal::Decimal>,
    /// Total wall-clock duration of the trial, in milliseconds.
    pub total_latency_ms: u64,
    /// Error message, if `stop_condition` is `AdapterError`.
    #[serde(default)]
    pub error: Option<String>,
    /// Whether the failure behind `error` is worth retrying the whole
    /// trial for (a transient infrastructure hiccup, not a permanent
    /// rejection). Always `false` when `stop_condition != AdapterError`.
    #[serde(default)]
    pub retryable: bool,
}

impl Trace {
    /// Build a minimal stub trace for a trial that never produced a real
    /// one — adapter construction failed, or retries were exhausted before
    /// a single turn ran. Carries no turns, just enough to report the
    /// failure against the scenario it was meant to run.
    #[allow(clippy::too_many_arguments)]
    pub fn stub(
        id: crate::ids::TraceId,
        scenario_id: impl Into<String>,
        scenario_hash: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        trial_index: u32,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id,
            scenario_id: scenario_id.into(),
            scenario_hash: scenario_hash.into(),
            provider: provider.into(),
            model: model.into(),
            timestamp: Utc::now(),
            trial_index,
            turns: Vec::new(),
            stop_condition: StopCondition::AdapterError,
            finish_reason: FinishReason::Error,
            total_usage: TokenUsage::default(),
            total_cost_usd: None,
            total_latency_ms: 0,
            error: Some(error.into()),
            retryable: false,
        }
    }

    /// The final assistant text content, if the trial completed normally.
    pub fn final_output(&self) -> Option<&str> {
        self.turns.last().map(|t| t.assistant_content.as_str())
    }

    /// A flat, in-order list of every tool name called across all turns.
    pub fn tool_call_sequence(&self) -> Vec<&str> {
        self.turns
            .iter()
            .flat_map(|t| t.tool_calls.iter())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Recompute `total_usage`/`total_cost_usd`/`total_latency_ms` from the
    /// per-turn records. Any turn with an unknown cost poisons the total.
    pub fn recompute_totals(&mut self) {
        let mut usage = TokenUsage::default();
        let mut latency_ms = 0u64;
        let mut cost = Some(rust_decimal::Decimal::ZERO);
        for turn in &self.turns {
            usage.add(turn.usage);
            latency_ms += turn.latency_ms;
            cost = match (cost, turn.cost_usd) {
                (Some(acc), Some(c)) => Some(acc + c),
                _ => None,
            };
        }
        self.total_usage = usage;
        self.total_latency_ms = latency_ms;
        self.total_cost_usd = cost;
    }
}
