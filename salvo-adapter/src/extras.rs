//! Validation for the free-form provider-extras map carried on `AdapterConfig`.

use crate::error::AdapterError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Maximum number of keys allowed in a provider-extras map.
pub const MAX_EXTRAS_KEYS: usize = 10;
/// Maximum serialized byte size of a provider-extras map.
pub const MAX_EXTRAS_BYTES: usize = 4096;

/// Key substrings that suggest a secret is being passed through extras
/// rather than through a credentials path. Checked case-insensitively.
const BLOCKED_KEY_SUBSTRINGS: &[&str] = &["key", "token", "secret", "password", "credential", "auth", "bearer"];

/// Validate a provider-extras map before it's forwarded to a provider.
///
/// Rejects maps that are too large, carry too many keys, or contain a key
/// that looks like it's smuggling a secret (extras are logged and recorded
/// verbatim; secrets belong in adapter construction, not scenario files).
pub fn validate_extras(extras: &BTreeMap<String, Value>) -> Result<(), AdapterError> {
    if extras.len() > MAX_EXTRAS_KEYS {
        return Err(AdapterError::InvalidExtras(format!(
            "too many keys: {} (max {MAX_EXTRAS_KEYS})",
            extras.len()
        )));
    }

    for key in extras.keys() {
        let lower = key.to_ascii_lowercase();
        if BLOCKED_KEY_SUBSTRINGS.iter().any(|blocked| lower.contains(blocked)) {
            return Err(AdapterError::InvalidExtras(format!("key '{key}' looks like a secret, refusing to forward it")));
        }
    }

    let size = serde_json::to_vec(extras).map(|v| v.len()).unwrap_or(usize::MAX);
    if size > MAX_EXTRAS_BYTES {
        return Err(AdapterError::InvalidExtras(format!("extras too large: {size} bytes (max {MAX_EXTRAS_BYTES})")));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_empty_extras() {
        assert!(validate_extras(&BTreeMap::new()).is_ok());
    }

    #[test]
    fn rejects_too_many_keys() {
        let mut extras = BTreeMap::new();
        for i in 0..=MAX_EXTRAS_KEYS {
            extras.insert(format!("k{i}"), json!(i));
        }
        assert!(validate_extras(&extras).is_err());
    }

    #[test]
    fn rejects_secret_like_keys_case_insensitively() {
        for bad in ["api_key", "API_KEY", "Auth_Token", "secret_value"] {
            let mut extras = BTreeMap::new();
            extras.insert(bad.to_string(), json!("x"));
            assert!(validate_extras(&extras).is_err(), "expected {bad} to be rejected");
        }
    }

    #[test]
    fn rejects_oversized_extras() {
        let mut extras = BTreeMap::new();
        extras.insert("blob".to_string(), json!("x".repeat(MAX_EXTRAS_BYTES + 1)));
        assert!(validate_extras(&extras).is_err());
    }

    #[test]
    fn accepts_benign_keys() {
        let mut extras = BTreeMap::new();
        extras.insert("top_p".to_string(), json!(0.9));
        extras.insert("presence_penalty".to_string(), json!(0.1));
        assert!(validate_extras(&extras).is_ok());
    }
}
