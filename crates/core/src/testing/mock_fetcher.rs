//! Mock download engine for testing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{oneshot, RwLock};

use crate::fetcher::{FetchError, FetchOutcome, Fetcher};

enum Mode {
    /// Materialize the scripted files and complete immediately.
    Complete,
    /// Fail with the given engine reason.
    Fail(String),
    /// Block until the cancellation signal arrives, then acknowledge.
    WaitForCancel,
}

/// Mock download engine with scriptable outcomes.
pub struct MockFetcher {
    mode: Mode,
    /// Relative paths created under the destination on completion.
    files: Vec<String>,
    calls: Arc<RwLock<Vec<(PathBuf, PathBuf)>>>,
}

impl MockFetcher {
    /// Completes immediately; pair with [`with_files`](Self::with_files)
    /// to control what lands in the destination.
    pub fn completing() -> Self {
        Self {
            mode: Mode::Complete,
            files: Vec::new(),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Fails every fetch with the given reason.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            mode: Mode::Fail(reason.into()),
            files: Vec::new(),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Never completes on its own; acknowledges cancellation when signalled.
    pub fn waiting_for_cancel() -> Self {
        Self {
            mode: Mode::WaitForCancel,
            files: Vec::new(),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Files (relative to the destination) written when a fetch completes.
    pub fn with_files(mut self, files: Vec<&str>) -> Self {
        self.files = files.into_iter().map(String::from).collect();
        self
    }

    /// Recorded (descriptor, destination) pairs, in call order.
    pub async fn recorded_calls(&self) -> Vec<(PathBuf, PathBuf)> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(
        &self,
        descriptor_path: &Path,
        dest_dir: &Path,
        cancel: oneshot::Receiver<()>,
    ) -> Result<FetchOutcome, FetchError> {
        self.calls
            .write()
            .await
            .push((descriptor_path.to_path_buf(), dest_dir.to_path_buf()));

        match &self.mode {
            Mode::Fail(reason) => Err(FetchError::EngineFailed(reason.clone())),
            Mode::WaitForCancel => {
                // A dropped sender also counts as cancellation.
                let _ = cancel.await;
                Ok(FetchOutcome::Cancelled)
            }
            Mode::Complete => {
                tokio::fs::create_dir_all(dest_dir).await?;
                for file in &self.files {
                    let path = dest_dir.join(file);
                    if let Some(parent) = path.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    tokio::fs::write(&path, b"mock media content").await?;
                }
                Ok(FetchOutcome::Completed)
            }
        }
    }
}
