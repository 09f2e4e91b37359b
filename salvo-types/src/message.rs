//! Unified message and tool-call types shared across adapters.
//!
//! These are Salvo's internal lingua franca — not any provider's wire
//! format. Adapters translate to/from these.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role of a message author in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System instructions.
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
    /// Result of a mock tool invocation, fed back to the model.
    ToolResult,
}

/// A single message in the unified conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author role.
    pub role: Role,
    /// Text content. Empty when the message is purely a set of tool calls.
    #[serde(default)]
    pub content: String,
    /// Tool calls emitted by the assistant in this message, if any.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// When `role == ToolResult`, the id of the `ToolCall` this responds to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// When `role == ToolResult`, the name of the tool that was invoked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    /// Build a plain-text message with no tool calls.
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Build a tool-result message fed back to the model.
    pub fn tool_result(tool_call_id: impl Into<String>, tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::ToolResult,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
            tool_name: Some(tool_name.into()),
        }
    }
}

/// A single tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned or adapter-assigned call id.
    pub id: String,
    /// Name of the tool being invoked.
    pub name: String,
    /// Structured arguments for the call.
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// Declares a tool available to the model, with its mock response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name, matched against `ToolCall::name`.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON-schema-shaped description of the input the tool expects.
    pub input_schema: serde_json::Value,
    /// The deterministic payload returned whenever this tool is called.
    pub mock_response: serde_json::Value,
}

/// Token usage for a single adapter call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input (prompt) tokens consumed.
    pub input_tokens: u64,
    /// Output (completion) tokens generated.
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Total tokens, input plus output.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Accumulate another call's usage into this one.
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Why the model stopped generating on a given turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model produced a final response with no further tool calls.
    Stop,
    /// The model requested one or more tool calls.
    ToolUse,
    /// The turn cap or the provider's max-tokens limit was hit.
    Length,
    /// Content was filtered by provider-side safety systems.
    ContentFilter,
    /// The adapter call itself failed (used only on Trace stubs).
    Error,
}

/// Provider-agnostic configuration for a single `SendTurn` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Deterministic seed; forwarded only where the provider supports it.
    pub seed: Option<i64>,
    /// Maximum output tokens for this call.
    pub max_tokens: Option<u32>,
    /// Per-call timeout in seconds.
    pub timeout_seconds: Option<u64>,
    /// Validated provider-extras passthrough (already blocklist-checked).
    #[serde(default)]
    pub extras: BTreeMap<String, serde_json::Value>,
}

/// Result of one single-turn adapter call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterTurnResult {
    /// Assistant text content for this turn (may be empty).
    pub assistant_content: String,
    /// Tool calls requested by the model this turn (possibly empty).
    pub tool_calls: Vec<ToolCall>,
    /// Token usage for this single call.
    pub usage: TokenUsage,
    /// Why the model stopped.
    pub finish_reason: FinishReason,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_serde_roundtrip() {
        for role in [Role::System, Role::User, Role::Assistant, Role::ToolResult] {
            let s = serde_json::to_string(&role).unwrap();
            let back: Role = serde_json::from_str(&s).unwrap();
            assert_eq!(role, back);
        }
    }

    #[test]
    fn tool_result_message_carries_id_and_name() {
        let msg = Message::tool_result("call_1", "search", "ok");
        assert_eq!(msg.role, Role::ToolResult);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.tool_name.as_deref(), Some("search"));
    }

    #[test]
    fn token_usage_accumulates() {
        let mut total = TokenUsage::default();
        total.add(TokenUsage { input_tokens: 10, output_tokens: 5 });
        total.add(TokenUsage { input_tokens: 3, output_tokens: 2 });
        assert_eq!(total.input_tokens, 13);
        assert_eq!(total.output_tokens, 7);
        assert_eq!(total.total(), 20);
    }

    #[test]
    fn tool_call_roundtrip() {
        let call = ToolCall {
            id: "c1".into(),
            name: "search".into(),
            arguments: json!({"q": "rust"}).as_object().unwrap().clone(),
        };
        let v = serde_json::to_value(&call).unwrap();
        let back: ToolCall = serde_json::from_value(v).unwrap();
        assert_eq!(call, back);
    }
}
