//! Deterministic tool-mock registry for Salvo scenarios.
//!
//! Scenarios declare tools and their canned responses up front; the runner
//! never executes real side effects. This mirrors the shape of a live tool
//! registry (name lookup, missing-entry handling) without the async call
//! surface, since a mock response needs no I/O.

use salvo_types::ToolDefinition;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from looking a tool up in the mock registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolError {
    /// The model requested a tool the scenario never declared.
    #[error("tool '{0}' was not declared on this scenario")]
    NotFound(String),
}

/// A scenario's declared tools, indexed by name for the runner to consult
/// on every tool call the model makes.
#[derive(Debug, Default)]
pub struct ToolMockRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl ToolMockRegistry {
    /// Build a registry from a scenario's ordered tool list.
    pub fn from_definitions(definitions: &[ToolDefinition]) -> Self {
        let tools = definitions.iter().cloned().map(|t| (t.name.clone(), t)).collect();
        Self { tools }
    }

    /// Look up the mock response for a tool call by name.
    pub fn resolve(&self, name: &str) -> Result<&serde_json::Value, ToolError> {
        self.tools.get(name).map(|t| &t.mock_response).ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Number of declared tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are declared.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
