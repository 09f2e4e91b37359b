//! Canonical assertion form.
//!
//! Per the redesign note in the original design docs, assertion dispatch is
//! a tagged variant, not a dynamic dispatch over a string `type` field with
//! ad-hoc extra keys. The evaluator registry matches on the variant; no
//! reflection, no "pop private keys out of a dict" convention.

use serde::{Deserialize, Serialize};

/// A single named, weighted axis within a `judge` assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    /// Short criterion name (used as a key in per-criterion medians).
    pub name: String,
    /// What the judge should evaluate for this criterion.
    pub description: String,
    /// Relative weight within the judge assertion.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

/// Comparison operator for `jmespath` assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// String/list containment.
    Contains,
    /// Regex match.
    Regex,
    /// Path resolves to a non-null value.
    Exists,
}

/// Ordering mode for `tool_sequence` assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceMode {
    /// Observed sequence equals expected exactly (length and order).
    Exact,
    /// Expected is a subsequence of observed; extras allowed anywhere.
    InOrder,
    /// Observed is a multiset-superset of expected; order irrelevant.
    AnyOrder,
}

/// Fields shared by every assertion, regardless of kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionCommon {
    /// Relative weight in the weighted scorer.
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Whether failing this assertion forces a hard fail.
    #[serde(default)]
    pub required: bool,
}

impl Default for AssertionCommon {
    fn default() -> Self {
        Self { weight: default_weight(), required: false }
    }
}

fn default_weight() -> f64 {
    1.0
}

/// One assertion in canonical form, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assertion {
    /// Structured-query evaluation over the flattened trace view.
    Jmespath {
        /// Shared fields.
        #[serde(flatten)]
        common: AssertionCommon,
        /// Path expression into the flattened view.
        expression: String,
        /// Comparison operator.
        operator: Operator,
        /// Literal to compare against (absent for `exists`).
        #[serde(default)]
        value: serde_json::Value,
    },
    /// Ordered/unordered comparison of observed tool-call names.
    ToolSequence {
        /// Shared fields.
        #[serde(flatten)]
        common: AssertionCommon,
        /// Expected tool name sequence.
        sequence: Vec<String>,
        /// Ordering mode.
        mode: SequenceMode,
    },
    /// Sugar for `ToolSequence` with `mode: AnyOrder` and one tool.
    ToolCalled {
        /// Shared fields.
        #[serde(flatten)]
        common: AssertionCommon,
        /// The tool name that must have been called at least once.
        tool: String,
    },
    /// Sugar for a `jmespath` assertion on `response.content` with `contains`.
    OutputContains {
        /// Shared fields.
        #[serde(flatten)]
        common: AssertionCommon,
        /// Substring the final response must contain.
        value: String,
    },
    /// Upper bound on total agent cost.
    CostLimit {
        /// Shared fields.
        #[serde(flatten)]
        common: AssertionCommon,
        /// Maximum allowed cost in USD.
        max_usd: rust_decimal::Decimal,
    },
    /// Upper bound on wall-clock trial latency.
    LatencyLimit {
        /// Shared fields.
        #[serde(flatten)]
        common: AssertionCommon,
        /// Maximum allowed latency in seconds.
        max_seconds: f64,
    },
    /// LLM-judge evaluation with k-vote consensus.
    Judge {
        /// Shared fields.
        #[serde(flatten)]
        common: AssertionCommon,
        /// Criteria the judge scores.
        criteria: Vec<Criterion>,
        /// Per-assertion judge model override.
        #[serde(default)]
        judge_model: Option<String>,
        /// Number of independent judge votes (must be odd). Absent means
        /// "use the project-level default" — resolved at evaluation time,
        /// not at parse time, so a project-wide override in `salvo.toml`
        /// isn't shadowed by a hardcoded constant baked in here.
        #[serde(default)]
        k: Option<u32>,
        /// Whether to include the agent's system prompt in judge context.
        #[serde(default)]
        include_system_prompt: bool,
        /// Custom prompt override.
        #[serde(default)]
        custom_prompt: Option<String>,
        /// Sampling temperature for the judge call. Absent means "use the
        /// project-level default".
        #[serde(default)]
        temperature: Option<f64>,
        /// Pass threshold for the weighted-mean judge score. Absent means
        /// "use the project-level default".
        #[serde(default)]
        threshold: Option<f64>,
    },
}

/// Hardcoded fallback when neither the assertion nor the project config
/// sets a judge vote count.
pub const DEFAULT_JUDGE_K: u32 = 3;
/// Hardcoded fallback when neither the assertion nor the project config
/// sets a judge temperature.
pub const DEFAULT_JUDGE_TEMPERATURE: f64 = 0.0;
/// Hardcoded fallback when neither the assertion nor the project config
/// sets a judge pass threshold.
pub const DEFAULT_JUDGE_THRESHOLD: f64 = 0.8;

impl Assertion {
    /// The shared fields common to every variant.
    pub fn common(&self) -> &AssertionCommon {
        match self {
            Assertion::Jmespath { common, .. }
            | Assertion::ToolSequence { common, .. }
            | Assertion::ToolCalled { common, .. }
            | Assertion::OutputContains { common, .. }
            | Assertion::CostLimit { common, .. }
            | Assertion::LatencyLimit { common, .. }
            | Assertion::Judge { common, .. } => common,
        }
    }

    /// Relative weight in the weighted scorer.
    pub fn weight(&self) -> f64 {
        self.common().weight
    }

    /// Whether failing this assertion forces a hard fail.
    pub fn required(&self) -> bool {
        self.common().required
    }

    /// The `type` discriminant string, for EvalResult/reporting.
    pub fn type_name(&self) -> &'static str {
        match self {
            Assertion::Jmespath { .. } => "jmespath",
            Assertion::ToolSequence { .. } => "tool_sequence",
            Assertion::ToolCalled { .. } => "tool_called",
            Assertion::OutputContains { .. } => "output_contains",
            Assertion::CostLimit { .. } => "cost_limit",
            Assertion::LatencyLimit { .. } => "latency_limit",
            Assertion::Judge { .. } => "judge",
        }
    }

    /// Whether this assertion's evaluation depends on message/tool-argument
    /// content (as opposed to only structural metadata). Used by the
    /// re-evaluator to decide what survives a `metadata_only` recording.
    pub fn is_content_dependent(&self) -> bool {
        matches!(
            self,
            Assertion::Jmespath { .. } | Assertion::Judge { .. } | Assertion::OutputContains { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_called_roundtrip() {
        let a = Assertion::ToolCalled {
            common: AssertionCommon { weight: 2.0, required: true },
            tool: "search".into(),
        };
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["type"], "tool_called");
        assert_eq!(v["weight"], 2.0);
        let back: Assertion = serde_json::from_value(v).unwrap();
        assert_eq!(a, back);
    }

    #[test]
    fn default_weight_and_required() {
        let v = json!({"type": "tool_called", "tool": "x"});
        let a: Assertion = serde_json::from_value(v).unwrap();
        assert_eq!(a.weight(), 1.0);
        assert!(!a.required());
    }

    #[test]
    fn judge_defaults() {
        let v = json!({
            "type": "judge",
            "criteria": [{"name": "helpful", "description": "is it helpful"}],
        });
        let a: Assertion = serde_json::from_value(v).unwrap();
        match a {
            Assertion::Judge { k, threshold, temperature, include_system_prompt, .. } => {
                assert_eq!(k, None);
                assert_eq!(threshold, None);
                assert_eq!(temperature, None);
                assert!(!include_system_prompt);
            }
            _ => panic!("expected Judge"),
        }
    }

    #[test]
    fn content_dependence_classification() {
        let jm = Assertion::Jmespath {
            common: AssertionCommon::default(),
            expression: "response.content".into(),
            operator: Operator::Exists,
            value: serde_json::Value::Null,
        };
        assert!(jm.is_content_dependent());

        let seq = Assertion::ToolSequence {
            common: AssertionCommon::default(),
            sequence: vec!["search".into()],
            mode: SequenceMode::Exact,
        };
        assert!(!seq.is_content_dependent());
    }

    #[test]
    fn type_name_matches_variant() {
        let cl = Assertion::CostLimit {
            common: AssertionCommon::default(),
            max_usd: rust_decimal::Decimal::new(1, 2),
        };
        assert_eq!(cl.type_name(), "cost_limit");
    }
}
