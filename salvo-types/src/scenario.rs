//! Scenario definition: the immutable input to a scenario run.

use crate::assertion::Assertion;
use crate::message::ToolDefinition;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Default turn cap for a scenario that doesn't specify one.
pub const DEFAULT_TURN_CAP: u32 = 10;
/// Lower bound on a scenario's turn cap.
pub const MIN_TURN_CAP: u32 = 1;
/// Upper bound on a scenario's turn cap.
pub const MAX_TURN_CAP: u32 = 100;
/// Default pass threshold when a scenario doesn't specify one.
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.8;

/// An immutable scenario, as loaded from a scenario file.
///
/// Once loaded, a `Scenario` never changes for the lifetime of a run; the
/// orchestrator clones the same scenario into every trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Stable identifier, usually the scenario file's stem.
    pub id: String,
    /// Which adapter to dispatch through (e.g. `"openai"`, `"anthropic"`).
    pub provider: String,
    /// Model identifier passed to the adapter.
    pub model: String,
    /// System prompt for the run, if any.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// The initial user message that starts the conversation.
    pub initial_prompt: String,
    /// Maximum number of agent turns before the run is cut off.
    #[serde(default = "default_turn_cap")]
    pub turn_cap: u32,
    /// Tools available to the model, in declaration order.
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    /// Assertions to evaluate against the resulting trace, in declared order.
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    /// Weighted score in `[0, 1]` required to pass.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,
    /// Free-form, provider-specific extras (validated before use).
    #[serde(default)]
    pub provider_extras: BTreeMap<String, serde_json::Value>,
}

fn default_turn_cap() -> u32 {
    DEFAULT_TURN_CAP
}

fn default_pass_threshold() -> f64 {
    DEFAULT_PASS_THRESHOLD
}

/// Error returned when a loaded scenario violates a structural invariant.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ScenarioError {
    /// `turn_cap` was outside `[MIN_TURN_CAP, MAX_TURN_CAP]`.
    #[error("turn_cap {0} out of bounds [{MIN_TURN_CAP}, {MAX_TURN_CAP}]")]
    TurnCapOutOfBounds(u32),
    /// `pass_threshold` was outside `[0, 1]`.
    #[error("pass_threshold {0} out of bounds [0, 1]")]
    PassThresholdOutOfBounds(f64),
    /// Two tools in the same scenario shared a name.
    #[error("duplicate tool name: {0}")]
    DuplicateToolName(String),
    /// A `judge` assertion set an explicit, even vote count.
    #[error("judge assertion k must be odd, got {0}")]
    JudgeKNotOdd(u32),
}

impl Scenario {
    /// Validate the structural invariants that a loader must enforce before
    /// a scenario is handed to the runner.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.turn_cap < MIN_TURN_CAP || self.turn_cap > MAX_TURN_CAP {
            return Err(ScenarioError::TurnCapOutOfBounds(self.turn_cap));
        }
        if !(0.0..=1.0).contains(&self.pass_threshold) {
            return Err(ScenarioError::PassThresholdOutOfBounds(self.pass_threshold));
        }
        let mut seen = std::collections::HashSet::new();
        for tool in &self.tools {
            if !seen.insert(&tool.name) {
                return Err(ScenarioError::DuplicateToolName(tool.name.clone()));
            }
        }
        for assertion in &self.assertions {
            if let Assertion::Judge { k: Some(k), .. } = assertion {
                if k % 2 == 0 {
                    return Err(ScenarioError::JudgeKNotOdd(*k));
                }
            }
        }
        Ok(())
    }

    /// SHA-256 content hash of the scenario's normalized form, used to
    /// detect drift between a recorded trace and the scenario it was
    /// recorded against.
    pub fn content_hash(&self) -> String {
        let normalized = serde_json::to_vec(self).expect("Scenario always serializes");
        let mut hasher = Sha256::new();
        hasher.update(&normalized);
        format!("{:x}", hasher.finalize())
    }

    /// Look up a declared tool by name.
    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }
}
