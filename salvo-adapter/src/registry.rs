//! Object-safe adapter boundary and the registry that looks adapters up by
//! provider name.

use crate::adapter::Adapter;
use crate::error::AdapterError;
use salvo_types::{AdapterConfig, AdapterTurnResult, Message, ToolDefinition};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Object-safe counterpart of `Adapter`, boxing the future so it can be
/// stored behind `Arc<dyn AdapterDyn>` in the registry. Mirrors the
/// `ToolDyn` boxed-future pattern used for tool dispatch.
pub trait AdapterDyn: Send + Sync {
    /// Boxed-future version of `Adapter::send_turn`.
    fn send_turn_boxed<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolDefinition],
        config: &'a AdapterConfig,
    ) -> Pin<Box<dyn Future<Output = Result<AdapterTurnResult, AdapterError>> + Send + 'a>>;

    /// The provider name this adapter speaks for.
    fn provider_name(&self) -> &'static str;
}

impl<T: Adapter> AdapterDyn for T {
    fn send_turn_boxed<'a>(
        &'a self,
        messages: &'a [Message],
        tools: &'a [ToolDefinition],
        config: &'a AdapterConfig,
    ) -> Pin<Box<dyn Future<Output = Result<AdapterTurnResult, AdapterError>> + Send + 'a>> {
        Box::pin(self.send_turn(messages, tools, config))
    }

    fn provider_name(&self) -> &'static str {
        Adapter::provider_name(self)
    }
}

/// Looks up adapter instances by provider name.
///
/// Built-in providers are registered by `salvo-cli` at startup (via the
/// `salvo-adapter-openai`/`salvo-adapter-anthropic` crates); tests and
/// custom integrations can register additional adapters at runtime.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn AdapterDyn>>,
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its provider name, overwriting any
    /// previous registration for that name.
    pub fn register(&mut self, adapter: Arc<dyn AdapterDyn>) {
        self.adapters.insert(adapter.provider_name().to_string(), adapter);
    }

    /// Register one of the two shipped providers under its own
    /// `provider_name()`. Equivalent to [`AdapterRegistry::register`] today
    /// — kept as a distinct entry point so a caller can see at a glance
    /// which registrations are the workspace's known providers versus a
    /// user-supplied one via [`AdapterRegistry::register_dynamic`].
    pub fn register_builtin(&mut self, adapter: Arc<dyn AdapterDyn>) {
        self.register(adapter);
    }

    /// Register an adapter under an arbitrary name, independent of its own
    /// `provider_name()`. The escape hatch for running the same adapter
    /// implementation under multiple aliases (e.g. two differently
    /// configured OpenAI-compatible endpoints) or wiring in a user adapter
    /// that doesn't ship with this workspace.
    pub fn register_dynamic(&mut self, name: impl Into<String>, adapter: Arc<dyn AdapterDyn>) {
        self.adapters.insert(name.into(), adapter);
    }

    /// Look up an adapter by provider name.
    pub fn get(&self, provider: &str) -> Option<Arc<dyn AdapterDyn>> {
        self.adapters.get(provider).cloned()
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether the registry has no registered adapters.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_types::{FinishReason, TokenUsage};

    struct EchoAdapter;

    impl Adapter for EchoAdapter {
        async fn send_turn(
            &self,
            _messages: &[Message],
            _tools: &[ToolDefinition],
            _config: &AdapterConfig,
        ) -> Result<AdapterTurnResult, AdapterError> {
            Ok(AdapterTurnResult {
                assistant_content: "echo".into(),
                tool_calls: Vec::new(),
                usage: TokenUsage::default(),
                finish_reason: FinishReason::Stop,
            })
        }

        fn provider_name(&self) -> &'static str {
            "echo"
        }
    }

    #[tokio::test]
    async fn registry_round_trips_an_adapter() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(EchoAdapter));
        assert_eq!(registry.len(), 1);

        let adapter = registry.get("echo").expect("registered");
        let config = AdapterConfig { model: "echo-1".into(), ..Default::default() };
        let result = adapter.send_turn_boxed(&[], &[], &config).await.unwrap();
        assert_eq!(result.assistant_content, "echo");
    }

    #[test]
    fn missing_provider_returns_none() {
        let registry = AdapterRegistry::new();
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn register_dynamic_uses_the_given_name_not_provider_name() {
        let mut registry = AdapterRegistry::new();
        registry.register_dynamic("echo-staging", Arc::new(EchoAdapter));
        assert!(registry.get("echo").is_none());
        assert!(registry.get("echo-staging").is_some());
    }
}
