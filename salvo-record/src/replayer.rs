//! Replayer: renders a recorded trace read-only. No adapter is ever
//! constructed — everything comes from the stored `RecordedTrace`.

use salvo_store::{FileStore, StoreError};
use salvo_types::{RecordMode, RecordedTrace, StopCondition};
use thiserror::Error;

const REPLAY_BANNER: &str = "[REPLAY]";

/// Errors surfaced while loading a trace to replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("no recorded trace found for '{0}'")]
    NotFound(String),
    #[error("no traces have been recorded yet, so 'latest' has no target")]
    NoLatest,
}

/// A read-only rendering of a recorded trace, annotated so it can never be
/// mistaken for a live run.
#[derive(Debug, Clone)]
pub struct ReplayView {
    pub banner: &'static str,
    pub trace_id: String,
    pub mode: RecordMode,
    pub stop_condition: StopCondition,
    pub final_output: Option<String>,
    pub tool_call_sequence: Vec<String>,
    pub cost_label: String,
    pub latency_label: String,
}

/// Load and render the trace named by `trace_id`, or the `latest` pointer
/// if `trace_id` is `"latest"`.
pub async fn replay(store: &FileStore, trace_id: &str) -> Result<ReplayView, ReplayError> {
    let resolved = if trace_id == "latest" {
        store.read_latest().await?.ok_or(ReplayError::NoLatest)?
    } else {
        trace_id.to_string()
    };

    let recorded: RecordedTrace = store
        .read_json(&store.recorded_trace_path(&resolved))
        .await?
        .ok_or_else(|| ReplayError::NotFound(resolved.clone()))?;

    Ok(render(&recorded))
}

fn render(recorded: &RecordedTrace) -> ReplayView {
    let trace = &recorded.trace;
    let cost_label = match trace.total_cost_usd {
        Some(c) => format!("${c} (recorded)"),
        None => "unknown (recorded)".to_string(),
    };
    ReplayView {
        banner: REPLAY_BANNER,
        trace_id: trace.id.as_str().to_string(),
        mode: recorded.mode,
        stop_condition: trace.stop_condition,
        final_output: trace.final_output().map(str::to_string),
        tool_call_sequence: trace.tool_call_sequence().into_iter().map(str::to_string).collect(),
        cost_label,
        latency_label: format!("{}ms (recorded)", trace.total_latency_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_types::{FinishReason, TokenUsage, TraceId, Turn};

    fn recorded_trace() -> RecordedTrace {
        let trace = salvo_types::Trace {
            id: TraceId::new("t1"),
            scenario_id: "greet".into(),
            scenario_hash: "h".into(),
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            timestamp: chrono::Utc::now(),
            trial_index: 0,
            turns: vec![Turn {
                index: 1,
                request_messages: Vec::new(),
                assistant_content: "done".into(),
                tool_calls: Vec::new(),
                tool_results: Vec::new(),
                usage: TokenUsage::default(),
                finish_reason: FinishReason::Stop,
                latency_ms: 100,
                cost_usd: Some(rust_decimal::Decimal::new(5, 2)),
            }],
            stop_condition: StopCondition::Completed,
            finish_reason: FinishReason::Stop,
            total_usage: TokenUsage::default(),
            total_cost_usd: Some(rust_decimal::Decimal::new(5, 2)),
            total_latency_ms: 100,
            error: None,
            retryable: false,
        };
        RecordedTrace::new(RecordMode::Full, trace)
    }

    #[tokio::test]
    async fn replay_by_explicit_trace_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let recorded = recorded_trace();
        store.write_json(&store.recorded_trace_path("t1"), &recorded).await.unwrap();

        let view = replay(&store, "t1").await.unwrap();
        assert_eq!(view.banner, REPLAY_BANNER);
        assert_eq!(view.final_output.as_deref(), Some("done"));
        assert!(view.cost_label.ends_with("(recorded)"));
    }

    #[tokio::test]
    async fn replay_latest_resolves_the_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let recorded = recorded_trace();
        store.write_json(&store.recorded_trace_path("t1"), &recorded).await.unwrap();
        store.write_latest("t1").await.unwrap();

        let view = replay(&store, "latest").await.unwrap();
        assert_eq!(view.trace_id, "t1");
    }

    #[tokio::test]
    async fn replay_latest_with_no_recordings_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let err = replay(&store, "latest").await.unwrap_err();
        assert!(matches!(err, ReplayError::NoLatest));
    }

    #[tokio::test]
    async fn replay_missing_trace_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let err = replay(&store, "nope").await.unwrap_err();
        assert!(matches!(err, ReplayError::NotFound(_)));
    }
}
