//! Builds the built-in adapter registry from environment variables.
//! `salvo-cli` is the only place in the workspace that knows these two
//! concrete providers exist — the core only ever sees `Arc<dyn AdapterDyn>`.

use salvo_adapter::registry::{AdapterDyn, AdapterRegistry};
use salvo_adapter_anthropic::AnthropicAdapter;
use salvo_adapter_openai::OpenAiAdapter;
use std::sync::Arc;

pub fn registry_from_env() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        registry.register_builtin(Arc::new(OpenAiAdapter::new(key)));
    }
    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        registry.register_builtin(Arc::new(AnthropicAdapter::new(key)));
    }
    registry
}

/// Builds a per-trial adapter factory for `provider`, cloning the same
/// `Arc` into every trial (adapters are stateless HTTP clients).
pub fn factory_for(registry: &AdapterRegistry, provider: &str) -> Option<impl Fn() -> Arc<dyn AdapterDyn> + Send + Sync + 'static> {
    let adapter = registry.get(provider)?;
    Some(move || Arc::clone(&adapter))
}
