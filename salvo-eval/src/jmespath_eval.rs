//! `jmespath` assertion evaluation.

use salvo_types::{EvalResult, Operator};
use serde_json::Value;

/// Evaluate a `jmespath` assertion against the flattened trace view.
pub fn evaluate(view: &Value, expression: &str, operator: Operator, expected: &Value, weight: f64, required: bool) -> EvalResult {
    let compiled = match jmespath::compile(expression) {
        Ok(c) => c,
        Err(e) => return EvalResult::boolean("jmespath", false, weight, required, format!("failed to compile expression: {e}")),
    };

    let jmespath_data = match jmespath::Variable::from_json(&view.to_string()) {
        Ok(v) => v,
        Err(e) => return EvalResult::boolean("jmespath", false, weight, required, format!("failed to build jmespath data: {e}")),
    };

    let found = match compiled.search(jmespath_data) {
        Ok(v) => v,
        Err(e) => return EvalResult::boolean("jmespath", false, weight, required, format!("expression evaluation failed: {e}")),
    };

    let actual: Value = serde_json::from_str(&found.to_string()).unwrap_or(Value::Null);

    let (passed, explanation) = match operator {
        Operator::Exists => {
            let exists = !actual.is_null();
            (exists, format!("path '{expression}' {} resolve to a value", if exists { "did" } else { "did not" }))
        }
        Operator::Eq => (actual == *expected, format!("expected {expected} == actual {actual}")),
        Operator::Ne => (actual != *expected, format!("expected {expected} != actual {actual}")),
        Operator::Contains => {
            let ok = match (&actual, expected) {
                (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
                (Value::Array(items), needle) => items.contains(needle),
                _ => false,
            };
            (ok, format!("expected '{actual}' to contain '{expected}'"))
        }
        Operator::Regex => {
            let ok = match (&actual, expected) {
                (Value::String(s), Value::String(pattern)) => regex::Regex::new(pattern).map(|re| re.is_match(s)).unwrap_or(false),
                _ => false,
            };
            (ok, format!("expected '{actual}' to match pattern '{expected}'"))
        }
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            let ok = compare_numeric(&actual, expected, operator);
            (ok, format!("expected actual {actual} {operator:?} {expected}"))
        }
    };

    EvalResult::boolean("jmespath", passed, weight, required, explanation)
}

fn compare_numeric(actual: &Value, expected: &Value, operator: Operator) -> bool {
    let (a, b) = match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return false,
    };
    match operator {
        Operator::Gt => a > b,
        Operator::Gte => a >= b,
        Operator::Lt => a < b,
        Operator::Lte => a <= b,
        _ => false,
    }
}
