//! Secret redaction and size-capping for recorded traces.
//!
//! Applied to every message and tool payload before `salvo-record` writes a
//! trace to disk. The pipeline is an ordered list of regex substitutions —
//! ordering matters because some patterns (the generic `Authorization:`
//! header) would otherwise swallow text a more specific pattern (an
//! Anthropic key) should redact on its own.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum length of a single message's text content after redaction.
pub const MESSAGE_REDACT_CAP: usize = 50_000;
/// Maximum length of a single tool-call or tool-result payload after
/// redaction.
pub const BLOB_REDACT_CAP: usize = 100_000;

const REPLACEMENT: &str = "[REDACTED]";

struct Pattern {
    regex: Regex,
    replacement: &'static str,
}

fn built_in_patterns() -> Vec<Pattern> {
    vec![
        Pattern { regex: Regex::new(r"sk-ant-[A-Za-z0-9_-]{20,}").unwrap(), replacement: REPLACEMENT },
        Pattern { regex: Regex::new(r"sk-[A-Za-z0-9]{20,}").unwrap(), replacement: REPLACEMENT },
        Pattern { regex: Regex::new(r"gh[pousr]_[A-Za-z0-9]{20,}").unwrap(), replacement: REPLACEMENT },
        Pattern { regex: Regex::new(r"(?i)bearer\s+[A-Za-z0-9._\-]+").unwrap(), replacement: "Bearer [REDACTED]" },
        Pattern { regex: Regex::new(r"(?i)authorization:\s*\S+").unwrap(), replacement: "Authorization: [REDACTED]" },
        Pattern { regex: Regex::new(r"(?i)(cookie|set-cookie):\s*\S+").unwrap(), replacement: "$1: [REDACTED]" },
    ]
}

static BUILT_IN: LazyLock<Vec<Pattern>> = LazyLock::new(built_in_patterns);

/// Applies the redaction pipeline to text before it's persisted.
pub struct Redactor {
    custom: Vec<Pattern>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self { custom: Vec::new() }
    }
}

impl Redactor {
    /// A redactor with only the built-in patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a project-specific pattern, applied after the built-ins.
    pub fn with_custom_pattern(mut self, pattern: Regex) -> Self {
        self.custom.push(Pattern { regex: pattern, replacement: REPLACEMENT });
        self
    }

    fn apply_patterns(&self, text: &str) -> String {
        let mut out = text.to_string();
        for pattern in BUILT_IN.iter() {
            out = pattern.regex.replace_all(&out, pattern.replacement).into_owned();
        }
        for pattern in &self.custom {
            out = pattern.regex.replace_all(&out, pattern.replacement).into_owned();
        }
        out
    }

    /// Redact and cap a message's text content.
    pub fn redact_message(&self, text: &str) -> String {
        truncate(&self.apply_patterns(text), MESSAGE_REDACT_CAP)
    }

    /// Redact and cap a tool-call or tool-result payload.
    pub fn redact_blob(&self, text: &str) -> String {
        truncate(&self.apply_patterns(text), BLOB_REDACT_CAP)
    }
}

fn truncate(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        return text.to_string();
    }
    let mut end = cap;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &text[..end])
}
