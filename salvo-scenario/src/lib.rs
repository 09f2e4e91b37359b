//! Scenario file loader.
//!
//! Parses a scenario document (YAML) into a validated `Scenario`: resolves
//! `!include` directives relative to the document's directory, rewrites
//! assertion shorthand into canonical form, maps the document's own key
//! names onto the core's `Scenario` shape, and validates the result.

mod include;
mod shorthand;

use salvo_types::{Scenario, ScenarioError, ToolDefinition};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a scenario file.
#[derive(Debug, Error)]
pub enum ScenarioLoadError {
    #[error("could not read scenario file '{path}': {source}")]
    NotFound { path: String, source: std::io::Error },
    #[error("could not read included file '{path}': {source}")]
    IncludeNotFound { path: String, source: std::io::Error },
    #[error("!include directive is malformed: {0}")]
    InvalidInclude(String),
    #[error("could not parse scenario document: {0}")]
    Parse(String),
    #[error("assertion is malformed: {0}")]
    InvalidAssertion(String),
    #[error("scenario failed validation: {0}")]
    Invalid(#[from] ScenarioError),
    #[error("provider extras rejected: {0}")]
    InvalidExtras(#[from] salvo_adapter::error::AdapterError),
}

/// The document's own key names, distinct from `Scenario`'s field names.
#[derive(Debug, Deserialize)]
struct ToolRaw {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    parameters: serde_json::Value,
    #[serde(default)]
    mock_response: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ScenarioFileRaw {
    #[serde(default)]
    #[allow(dead_code)]
    description: Option<String>,
    adapter: String,
    model: String,
    #[serde(default)]
    system_prompt: Option<String>,
    prompt: String,
    #[serde(default)]
    tools: Vec<ToolRaw>,
    #[serde(default)]
    assertions: Vec<serde_json::Value>,
    #[serde(default)]
    threshold: Option<f64>,
    #[serde(default)]
    max_turns: Option<u32>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    seed: Option<i64>,
    #[serde(default)]
    extras: BTreeMap<String, serde_json::Value>,
}

/// Load and validate a scenario file at `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Scenario, ScenarioLoadError> {
    let path = path.as_ref();
    let raw_text = std::fs::read_to_string(path)
        .map_err(|e| ScenarioLoadError::NotFound { path: path.display().to_string(), source: e })?;

    let document: serde_yaml::Value =
        serde_yaml::from_str(&raw_text).map_err(|e| ScenarioLoadError::Parse(e.to_string()))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let resolved = include::resolve(document, base_dir)?;

    let as_json = serde_json::to_value(&resolved).map_err(|e| ScenarioLoadError::Parse(e.to_string()))?;
    let raw: ScenarioFileRaw =
        serde_json::from_value(as_json).map_err(|e| ScenarioLoadError::Parse(e.to_string()))?;

    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("scenario")
        .to_string();

    into_scenario(raw, id)
}

fn into_scenario(raw: ScenarioFileRaw, id: String) -> Result<Scenario, ScenarioLoadError> {
    let tools = raw
        .tools
        .into_iter()
        .map(|t| ToolDefinition {
            name: t.name,
            description: t.description,
            input_schema: t.parameters,
            mock_response: t.mock_response,
        })
        .collect();

    let assertions = raw
        .assertions
        .into_iter()
        .map(shorthand::rewrite)
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(|e| ScenarioLoadError::InvalidAssertion(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    let mut extras = raw.extras;
    if let Some(temperature) = raw.temperature {
        extras.insert("temperature".into(), serde_json::json!(temperature));
    }
    if let Some(seed) = raw.seed {
        extras.insert("seed".into(), serde_json::json!(seed));
    }
    salvo_adapter::validate_extras(&extras)?;

    let scenario = Scenario {
        id,
        provider: raw.adapter,
        model: raw.model,
        system_prompt: raw.system_prompt,
        initial_prompt: raw.prompt,
        turn_cap: raw.max_turns.unwrap_or(salvo_types::scenario::DEFAULT_TURN_CAP),
        tools,
        assertions,
        pass_threshold: raw.threshold.unwrap_or(salvo_types::scenario::DEFAULT_PASS_THRESHOLD),
        provider_extras: extras,
    };
    scenario.validate()?;
    Ok(scenario)
}
