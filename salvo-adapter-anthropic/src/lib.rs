#![deny(missing_docs)]
//! Anthropic Messages API adapter for Salvo.

mod wire;

use salvo_adapter::{Adapter, AdapterError};
use salvo_types::{AdapterConfig, AdapterTurnResult, FinishReason, Message, Role, ToolCall, ToolDefinition, TokenUsage};
use wire::*;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Adapter for Anthropic's Messages API.
pub struct AnthropicAdapter {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl AnthropicAdapter {
    /// Build a new adapter using the given API key and the default
    /// Anthropic base URL.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// Override the base URL, for testing or proxies.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolDefinition], config: &AdapterConfig) -> AnthropicRequest {
        let mut system_parts = Vec::new();
        let mut wire_messages = Vec::with_capacity(messages.len());

        for m in messages {
            match m.role {
                Role::System => system_parts.push(m.content.clone()),
                Role::User => {
                    wire_messages.push(AnthropicMessage { role: "user".into(), content: vec![AnthropicBlock::Text { text: m.content.clone() }] });
                }
                Role::ToolResult => {
                    let tool_use_id = m.tool_call_id.clone().unwrap_or_default();
                    wire_messages.push(AnthropicMessage {
                        role: "user".into(),
                        content: vec![AnthropicBlock::ToolResult { tool_use_id, content: m.content.clone() }],
                    });
                }
                Role::Assistant => {
                    let mut blocks = Vec::new();
                    if !m.content.is_empty() {
                        blocks.push(AnthropicBlock::Text { text: m.content.clone() });
                    }
                    for call in &m.tool_calls {
                        blocks.push(AnthropicBlock::ToolUse {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            input: serde_json::Value::Object(call.arguments.clone()),
                        });
                    }
                    wire_messages.push(AnthropicMessage { role: "assistant".into(), content: blocks });
                }
            }
        }

        let system = if system_parts.is_empty() { None } else { Some(system_parts.join("\n\n")) };

        let wire_tools = tools
            .iter()
            .map(|t| AnthropicTool { name: t.name.clone(), description: t.description.clone(), input_schema: t.input_schema.clone() })
            .collect();

        AnthropicRequest {
            model: config.model.clone(),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages: wire_messages,
            temperature: config.temperature,
            tools: wire_tools,
            extras: config.extras.clone(),
        }
    }

    fn parse_response(&self, response: AnthropicResponse) -> Result<AdapterTurnResult, AdapterError> {
        let mut assistant_content = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block {
                AnthropicBlock::Text { text } => {
                    if !assistant_content.is_empty() {
                        assistant_content.push('\n');
                    }
                    assistant_content.push_str(&text);
                }
                AnthropicBlock::ToolUse { id, name, input } => {
                    let arguments = input.as_object().cloned().unwrap_or_default();
                    tool_calls.push(ToolCall { id, name, arguments });
                }
                AnthropicBlock::ToolResult { .. } => {}
            }
        }

        let finish_reason = match response.stop_reason.as_str() {
            "end_turn" | "stop_sequence" => FinishReason::Stop,
            "tool_use" => FinishReason::ToolUse,
            "max_tokens" => FinishReason::Length,
            _ => FinishReason::Stop,
        };

        Ok(AdapterTurnResult {
            assistant_content,
            tool_calls,
            usage: TokenUsage { input_tokens: response.usage.input_tokens, output_tokens: response.usage.output_tokens },
            finish_reason,
        })
    }
}

impl Adapter for AnthropicAdapter {
    async fn send_turn(&self, messages: &[Message], tools: &[ToolDefinition], config: &AdapterConfig) -> Result<AdapterTurnResult, AdapterError> {
        salvo_adapter::validate_extras(&config.extras)?;
        let api_request = self.build_request(messages, tools, config);

        tracing::debug!(model = %config.model, message_count = messages.len(), "sending anthropic turn");

        let mut builder = self
            .client
            .post(self.messages_url())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json");
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(timeout));
        }

        let http_response = builder.json(&api_request).send().await.map_err(|e| AdapterError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        let body_text = http_response.text().await.map_err(|e| AdapterError::RequestFailed(e.to_string()))?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AdapterError::RateLimited { retry_after_ms: None });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AdapterError::AuthFailed(extract_error_message(&body_text)));
        }
        if status.is_client_error() && status != reqwest::StatusCode::REQUEST_TIMEOUT {
            return Err(AdapterError::RequestRejected(format!("HTTP {status}: {}", extract_error_message(&body_text))));
        }
        if !status.is_success() {
            return Err(AdapterError::RequestFailed(format!("HTTP {status}: {}", extract_error_message(&body_text))));
        }

        let api_response: AnthropicResponse = serde_json::from_str(&body_text).map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;
        self.parse_response(api_response)
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<AnthropicErrorBody>(body).map(|b| b.error.message).unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_types::{AdapterConfig, Message};

    #[test]
    fn build_request_moves_system_messages_to_top_level() {
        let adapter = AnthropicAdapter::new("test-key");
        let messages = vec![Message::text(Role::System, "be terse"), Message::text(Role::User, "hello")];
        let config = AdapterConfig { model: "claude-3-5-sonnet-20241022".into(), ..Default::default() };
        let req = adapter.build_request(&messages, &[], &config);
        assert_eq!(req.system.as_deref(), Some("be terse"));
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.messages[0].role, "user");
    }

    #[test]
    fn build_request_defaults_max_tokens() {
        let adapter = AnthropicAdapter::new("test-key");
        let config = AdapterConfig { model: "claude-3-5-sonnet-20241022".into(), ..Default::default() };
        let req = adapter.build_request(&[], &[], &config);
        assert_eq!(req.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn tool_result_wraps_in_user_role_message() {
        let adapter = AnthropicAdapter::new("test-key");
        let messages = vec![Message::tool_result("call_1", "search", "ok")];
        let config = AdapterConfig { model: "claude-3-5-sonnet-20241022".into(), ..Default::default() };
        let req = adapter.build_request(&messages, &[], &config);
        assert_eq!(req.messages[0].role, "user");
        match &req.messages[0].content[0] {
            AnthropicBlock::ToolResult { tool_use_id, .. } => assert_eq!(tool_use_id, "call_1"),
            _ => panic!("expected tool_result block"),
        }
    }

    #[test]
    fn parse_response_extracts_tool_use_and_finish_reason() {
        let adapter = AnthropicAdapter::new("test-key");
        let response = AnthropicResponse {
            model: "claude-3-5-sonnet-20241022".into(),
            content: vec![AnthropicBlock::ToolUse { id: "call_1".into(), name: "search".into(), input: serde_json::json!({"q": "rust"}) }],
            stop_reason: "tool_use".into(),
            usage: AnthropicUsage { input_tokens: 10, output_tokens: 5 },
        };
        let result = adapter.parse_response(response).unwrap();
        assert_eq!(result.finish_reason, FinishReason::ToolUse);
        assert_eq!(result.tool_calls[0].name, "search");
    }
}
