//! Types for the download engine boundary.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors that can occur while fetching a descriptor's content.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to read descriptor: {0}")]
    DescriptorUnreadable(String),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Download engine error: {0}")]
    EngineFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// How a fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// All content was downloaded into the destination directory.
    Completed,
    /// The fetch observed the cancellation signal and stopped.
    Cancelled,
}

/// A download engine that turns a descriptor into bytes on disk.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Returns the name of this fetcher implementation.
    fn name(&self) -> &str;

    /// Fetches the descriptor's content into `dest_dir`.
    ///
    /// Runs until completion, failure, or until `cancel` resolves. A
    /// cancelled fetch stops the underlying transfer before returning
    /// [`FetchOutcome::Cancelled`]; partially written files are left in
    /// place for the caller's cleanup flow.
    async fn fetch(
        &self,
        descriptor_path: &Path,
        dest_dir: &Path,
        cancel: oneshot::Receiver<()>,
    ) -> Result<FetchOutcome, FetchError>;
}
