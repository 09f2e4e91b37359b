#![deny(missing_docs)]
//! OpenAI-compatible Chat Completions adapter for Salvo.

mod wire;

use salvo_adapter::{Adapter, AdapterError};
use salvo_types::{AdapterConfig, AdapterTurnResult, FinishReason, Message, Role, ToolCall, ToolDefinition, TokenUsage};
use wire::*;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Adapter for OpenAI's Chat Completions API and OpenAI-compatible backends.
pub struct OpenAiAdapter {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl OpenAiAdapter {
    /// Build a new adapter using the given API key and the default OpenAI
    /// base URL.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }

    /// Override the base URL, for proxies and OpenAI-compatible backends.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_request(&self, messages: &[Message], tools: &[ToolDefinition], config: &AdapterConfig) -> OpenAIRequest {
        let mut wire_messages = Vec::with_capacity(messages.len());
        for m in messages {
            let role = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::ToolResult => "tool",
            };
            let tool_calls = if m.tool_calls.is_empty() {
                None
            } else {
                Some(
                    m.tool_calls
                        .iter()
                        .map(|c| OpenAIToolCall {
                            id: c.id.clone(),
                            call_type: "function".into(),
                            function: OpenAIFunctionCall {
                                name: c.name.clone(),
                                arguments: serde_json::to_string(&c.arguments).unwrap_or_default(),
                            },
                        })
                        .collect(),
                )
            };
            wire_messages.push(OpenAIMessage {
                role: role.into(),
                content: if m.content.is_empty() && tool_calls.is_some() { None } else { Some(m.content.clone()) },
                tool_calls,
                tool_call_id: m.tool_call_id.clone(),
            });
        }

        let wire_tools = tools
            .iter()
            .map(|t| OpenAITool {
                tool_type: "function".into(),
                function: OpenAIFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect();

        OpenAIRequest {
            model: config.model.clone(),
            messages: wire_messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            seed: config.seed,
            tools: wire_tools,
            extras: config.extras.clone(),
        }
    }

    fn parse_response(&self, response: OpenAIResponse) -> Result<AdapterTurnResult, AdapterError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::InvalidResponse("no choices in response".into()))?;

        let assistant_content = choice.message.content.unwrap_or_default();

        let mut tool_calls = Vec::new();
        if let Some(calls) = choice.message.tool_calls {
            for tc in calls {
                let arguments: serde_json::Value = serde_json::from_str(&tc.function.arguments).unwrap_or(serde_json::Value::Null);
                let arguments = arguments.as_object().cloned().unwrap_or_default();
                tool_calls.push(ToolCall { id: tc.id, name: tc.function.name, arguments });
            }
        }

        let finish_reason = match choice.finish_reason.as_str() {
            "stop" => FinishReason::Stop,
            "tool_calls" => FinishReason::ToolUse,
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        Ok(AdapterTurnResult {
            assistant_content,
            tool_calls,
            usage: TokenUsage {
                input_tokens: response.usage.prompt_tokens,
                output_tokens: response.usage.completion_tokens,
            },
            finish_reason,
        })
    }
}

impl Adapter for OpenAiAdapter {
    async fn send_turn(&self, messages: &[Message], tools: &[ToolDefinition], config: &AdapterConfig) -> Result<AdapterTurnResult, AdapterError> {
        salvo_adapter::validate_extras(&config.extras)?;
        let api_request = self.build_request(messages, tools, config);

        tracing::debug!(model = %config.model, message_count = messages.len(), "sending openai turn");

        let mut builder = self.client.post(&self.base_url).bearer_auth(&self.api_key).header("content-type", "application/json");
        if let Some(timeout) = config.timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(timeout));
        }

        let http_response = builder.json(&api_request).send().await.map_err(|e| AdapterError::RequestFailed(e.to_string()))?;

        let status = http_response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = http_response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            return Err(AdapterError::RateLimited { retry_after_ms });
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = http_response.text().await.unwrap_or_default();
            return Err(AdapterError::AuthFailed(body));
        }
        if status.is_client_error() && status != reqwest::StatusCode::REQUEST_TIMEOUT {
            let body = http_response.text().await.unwrap_or_default();
            return Err(AdapterError::RequestRejected(format!("HTTP {status}: {body}")));
        }
        if !status.is_success() {
            let body = http_response.text().await.unwrap_or_default();
            return Err(AdapterError::RequestFailed(format!("HTTP {status}: {body}")));
        }

        let api_response: OpenAIResponse = http_response.json().await.map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;
        self.parse_response(api_response)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
