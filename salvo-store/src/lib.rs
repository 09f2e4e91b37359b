//! Atomic, content-addressed file storage under `<project>/.salvo/`.
//!
//! Every write goes to a temp file in the same directory, then renames
//! into place — a crash or a concurrent reader never observes a partial
//! file. Directory layout:
//!
//! ```text
//! .salvo/
//!   runs/<run_id>.json
//!   traces/<trace_id>.json
//!   revals/<reval_id>.json
//!   manifest.json
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors from reading or writing the store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The write side of an atomic write failed.
    #[error("write failed: {0}")]
    WriteFailed(String),
    /// Reading an existing file failed.
    #[error("read failed: {0}")]
    ReadFailed(String),
    /// The stored bytes didn't deserialize as the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

/// Filesystem-backed store rooted at a project's `.salvo/` directory.
pub struct FileStore {
    root: PathBuf,
    manifest_lock: Mutex<()>,
}

impl FileStore {
    /// Open a store rooted at the given `.salvo/` directory. The directory
    /// is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), manifest_lock: Mutex::new(()) }
    }

    /// The `runs/<run_id>.json` path for a suite run.
    pub fn run_path(&self, run_id: &str) -> PathBuf {
        self.root.join("runs").join(format!("{run_id}.json"))
    }

    /// The `traces/<trace_id>.json` path for a raw trace.
    pub fn trace_path(&self, trace_id: &str) -> PathBuf {
        self.root.join("traces").join(format!("{trace_id}.json"))
    }

    /// The `traces/<trace_id>.recorded.json` path for a redacted, recorded
    /// trace.
    pub fn recorded_trace_path(&self, trace_id: &str) -> PathBuf {
        self.root.join("traces").join(format!("{trace_id}.recorded.json"))
    }

    /// The `traces/latest` pointer path.
    pub fn latest_path(&self) -> PathBuf {
        self.root.join("traces").join("latest")
    }

    /// Atomically point `traces/latest` at `trace_id`.
    pub async fn write_latest(&self, trace_id: &str) -> Result<(), StoreError> {
        self.write_atomic(&self.latest_path(), trace_id.as_bytes()).await
    }

    /// Read the `traces/latest` pointer, if one has been written yet.
    pub async fn read_latest(&self) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(self.latest_path()).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::ReadFailed(e.to_string())),
        }
    }

    /// The `revals/<reval_id>.json` path for a re-evaluation result.
    pub fn reval_path(&self, reval_id: &str) -> PathBuf {
        self.root.join("revals").join(format!("{reval_id}.json"))
    }

    /// The manifest path.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    /// Serialize `value` as pretty JSON and write it atomically to `path`
    /// (an absolute path, typically obtained from `run_path`/`trace_path`).
    pub async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        self.write_atomic(path, &bytes).await
    }

    /// Read and deserialize a JSON file. Returns `Ok(None)` if it doesn't
    /// exist.
    pub async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>, StoreError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| StoreError::Deserialization(e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::ReadFailed(e.to_string())),
        }
    }

    /// Write `bytes` to `path` via a temp file in the same directory,
    /// followed by a rename — the write is all-or-nothing from any
    /// concurrent reader's perspective.
    pub async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let dir = path.parent().ok_or_else(|| StoreError::WriteFailed("path has no parent directory".into()))?;
        tokio::fs::create_dir_all(dir).await.map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        let tmp_path = dir.join(format!(".{}.tmp", path.file_name().and_then(|n| n.to_str()).unwrap_or("salvo")));
        tokio::fs::write(&tmp_path, bytes).await.map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        tokio::fs::rename(&tmp_path, path).await.map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    /// Read-modify-write the manifest under a lock, so concurrent trial
    /// completions don't race each other's append.
    pub async fn update_manifest<F, T>(&self, update: F) -> Result<(), StoreError>
    where
        F: FnOnce(Option<T>) -> T,
        T: Serialize + DeserializeOwned,
    {
        let _guard = self.manifest_lock.lock().await;
        let path = self.manifest_path();
        let current: Option<T> = self.read_json(&path).await?;
        let updated = update(current);
        self.write_json(&path, &updated).await
    }
}
