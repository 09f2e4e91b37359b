//! Rewrites operator-key assertion shorthand (`{path: ..., contains: X}`)
//! into the canonical tagged `Assertion` form before it's deserialized.

use crate::ScenarioLoadError;

const OPERATOR_KEYS: &[&str] = &["eq", "ne", "gt", "gte", "lt", "lte", "contains", "regex", "exists"];

pub(crate) fn rewrite(value: serde_json::Value) -> Result<serde_json::Value, ScenarioLoadError> {
    let obj = match value {
        serde_json::Value::Object(obj) => obj,
        other => return Err(ScenarioLoadError::InvalidAssertion(format!("assertion must be a mapping, got {other}"))),
    };

    if obj.contains_key("type") {
        return Ok(serde_json::Value::Object(obj));
    }

    let path = obj
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ScenarioLoadError::InvalidAssertion("assertion has no 'type' and no 'path' to rewrite from".into()))?
        .to_string();

    let mut matched: Option<(&str, serde_json::Value)> = None;
    for op in OPERATOR_KEYS {
        if let Some(v) = obj.get(*op) {
            if matched.is_some() {
                return Err(ScenarioLoadError::InvalidAssertion(format!(
                    "assertion at path '{path}' specifies more than one operator key"
                )));
            }
            matched = Some((op, v.clone()));
        }
    }
    let (operator, operator_value) = matched.ok_or_else(|| {
        ScenarioLoadError::InvalidAssertion(format!("assertion at path '{path}' has no recognized operator key"))
    })?;

    let mut canonical = serde_json::Map::new();
    canonical.insert("type".into(), serde_json::Value::String("jmespath".into()));
    canonical.insert("expression".into(), serde_json::Value::String(path));
    canonical.insert("operator".into(), serde_json::Value::String(operator.to_string()));
    canonical.insert("value".into(), operator_value);
    if let Some(weight) = obj.get("weight") {
        canonical.insert("weight".into(), weight.clone());
    }
    if let Some(required) = obj.get("required") {
        canonical.insert("required".into(), required.clone());
    }
    Ok(serde_json::Value::Object(canonical))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leaves_canonical_assertions_untouched() {
        let v = json!({"type": "tool_called", "tool": "search"});
        let rewritten = rewrite(v.clone()).unwrap();
        assert_eq!(rewritten, v);
    }

    #[test]
    fn rewrites_operator_key_shorthand_to_canonical_jmespath() {
        let v = json!({"path": "response.content", "contains": "42", "weight": 2.0});
        let rewritten = rewrite(v).unwrap();
        assert_eq!(rewritten["type"], "jmespath");
        assert_eq!(rewritten["expression"], "response.content");
        assert_eq!(rewritten["operator"], "contains");
        assert_eq!(rewritten["value"], "42");
        assert_eq!(rewritten["weight"], 2.0);
    }

    #[test]
    fn rejects_a_path_with_no_operator_key() {
        let v = json!({"path": "response.content", "weight": 2.0});
        assert!(rewrite(v).is_err());
    }

    #[test]
    fn rejects_ambiguous_multi_operator_shorthand() {
        let v = json!({"path": "response.content", "contains": "42", "eq": "43"});
        assert!(rewrite(v).is_err());
    }

    #[test]
    fn rejects_an_assertion_with_neither_type_nor_path() {
        let v = json!({"weight": 2.0});
        assert!(rewrite(v).is_err());
    }
}
