//! Result of evaluating a single assertion against a trace.

use serde::{Deserialize, Serialize};

/// Outcome of evaluating one assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalResult {
    /// Position of the assertion within `Scenario::assertions`, stamped in
    /// by `evaluate_all` — used to group failures by assertion for
    /// `SuiteResult::failure_ranking`.
    #[serde(default)]
    pub assertion_index: usize,
    /// `Assertion::type_name()` of the assertion that was evaluated.
    pub assertion_type: String,
    /// Whether the assertion passed.
    pub passed: bool,
    /// Weight carried into the weighted scorer.
    pub weight: f64,
    /// Whether this assertion was `required` (a failure here forces a
    /// suite-level hard fail).
    pub required: bool,
    /// Score in `[0, 1]` contributed by this assertion. Boolean assertions
    /// report 0.0 or 1.0; `judge` reports its continuous weighted mean.
    pub score: f64,
    /// Human-readable explanation, always present even on pass.
    pub explanation: String,
    /// Raw per-criterion detail for `judge` assertions (criterion name to
    /// median score), empty for every other assertion type.
    #[serde(default)]
    pub judge_detail: std::collections::BTreeMap<String, f64>,
    /// Total judge LLM cost for `judge` assertions, `None` for every other
    /// type or when any vote's cost was unpriced (poisons, never zero).
    #[serde(default)]
    pub judge_cost_usd: Option<rust_decimal::Decimal>,
}

impl EvalResult {
    /// Build a simple boolean pass/fail result for non-judge assertions.
    pub fn boolean(assertion_type: impl Into<String>, passed: bool, weight: f64, required: bool, explanation: impl Into<String>) -> Self {
        Self {
            assertion_index: 0,
            assertion_type: assertion_type.into(),
            passed,
            weight,
            required,
            score: if passed { 1.0 } else { 0.0 },
            explanation: explanation.into(),
            judge_detail: Default::default(),
            judge_cost_usd: None,
        }
    }
}
