//! Recorder: redacts a trace and persists it, updating the run manifest
//! and the `latest` pointer under the same lock the store already
//! serializes manifest updates through.

use salvo_redact::Redactor;
use salvo_store::{FileStore, StoreError};
use salvo_types::{ManifestEntry, RecordMode, RecordedTrace, Trace};
use std::collections::BTreeMap;

const CONTENT_EXCLUDED: &str = "[CONTENT_EXCLUDED]";

/// Manifest shape: run id to the recorded traces that belong to it, in the
/// order they were recorded.
pub type Manifest = BTreeMap<String, Vec<ManifestEntry>>;

/// Persist `trace` under `run_id`, in `mode`, redacting or scrubbing its
/// content first.
pub async fn record(store: &FileStore, redactor: &Redactor, run_id: &str, trace: &Trace, mode: RecordMode, status: impl Into<String>) -> Result<RecordedTrace, StoreError> {
    let content = match mode {
        RecordMode::Full => redact_full(trace, redactor),
        RecordMode::MetadataOnly => scrub_metadata_only(trace),
    };
    let recorded = RecordedTrace::new(mode, content);

    let path = store.recorded_trace_path(recorded.trace.id.as_str());
    store.write_json(&path, &recorded).await?;

    let trace_id = recorded.trace.id.clone();
    let trial_index = recorded.trace.trial_index;
    let status = status.into();
    store
        .update_manifest::<_, Manifest>(move |current| {
            let mut manifest = current.unwrap_or_default();
            manifest.entry(run_id.to_string()).or_default().push(ManifestEntry { trace_id, trial_index, status });
            manifest
        })
        .await?;

    store.write_latest(recorded.trace.id.as_str()).await?;

    Ok(recorded)
}

/// Redact message content, assistant text, and tool-call arguments in
/// place, leaving the trace's shape untouched.
fn redact_full(trace: &Trace, redactor: &Redactor) -> Trace {
    let mut t = trace.clone();
    for turn in &mut t.turns {
        for m in &mut turn.request_messages {
            m.content = redactor.redact_blob(&m.content);
        }
        turn.assistant_content = redactor.redact_message(&turn.assistant_content);
        for m in &mut turn.tool_results {
            m.content = redactor.redact_blob(&m.content);
        }
        for call in &mut turn.tool_calls {
            redact_tool_arguments(call, redactor);
        }
    }
    t
}

/// Redact a tool call's structured arguments by round-tripping them
/// through the text redaction pipeline. If anything was redacted, the
/// whole argument map collapses to a single `_redacted` field — a secret
/// split across two keys (e.g. `{"token_prefix": "sk-", "token_rest":
/// "..."}`)  shouldn't survive by accident because only one key matched a
/// pattern.
fn redact_tool_arguments(call: &mut salvo_types::ToolCall, redactor: &Redactor) {
    let serialized = serde_json::to_string(&call.arguments).unwrap_or_default();
    let redacted = redactor.redact_blob(&serialized);
    if redacted != serialized {
        let mut map = serde_json::Map::new();
        map.insert("_redacted".into(), serde_json::Value::String(redacted));
        call.arguments = map;
    }
}

/// Replace every piece of message/tool-argument content with a sentinel,
/// preserving roles, tool names, turn counts, and usage.
fn scrub_metadata_only(trace: &Trace) -> Trace {
    let mut t = trace.clone();
    for turn in &mut t.turns {
        for m in &mut turn.request_messages {
            m.content = CONTENT_EXCLUDED.to_string();
        }
        turn.assistant_content = CONTENT_EXCLUDED.to_string();
        for m in &mut turn.tool_results {
            m.content = CONTENT_EXCLUDED.to_string();
        }
        for call in &mut turn.tool_calls {
            let mut map = serde_json::Map::new();
            map.insert("_content".into(), serde_json::Value::String(CONTENT_EXCLUDED.to_string()));
            call.arguments = map;
        }
    }
    t
}
