//! The `Adapter` trait: one provider's single-turn completion call.

use crate::error::AdapterError;
use salvo_types::{AdapterConfig, AdapterTurnResult, Message, ToolDefinition};
use std::future::Future;

/// Translates Salvo's unified message/tool types to and from one provider's
/// wire format and performs the HTTP call.
///
/// Uses return-position `impl Trait` rather than `async_trait` because
/// nothing needs to hold a `dyn Adapter` — the runner is generic over a
/// concrete adapter type per trial, so there's no object-safety requirement
/// here. `AdapterRegistry` below is the object-safe boundary, built on a
/// constructor function rather than the trait itself.
pub trait Adapter: Send + Sync {
    /// Send one turn: the full message history plus the scenario's tool
    /// declarations, and get back the model's response for this turn.
    fn send_turn(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        config: &AdapterConfig,
    ) -> impl Future<Output = Result<AdapterTurnResult, AdapterError>> + Send;

    /// The provider name this adapter speaks for (e.g. `"openai"`).
    fn provider_name(&self) -> &'static str;
}
