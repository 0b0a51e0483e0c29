//! librqbit embedded download engine implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use librqbit::{AddTorrent, AddTorrentOptions, AddTorrentResponse, Session};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::types::{FetchError, FetchOutcome, Fetcher};

/// Embedded librqbit download engine.
pub struct LibrqbitFetcher {
    session: Arc<Session>,
}

impl LibrqbitFetcher {
    /// Creates a fetcher with an embedded session rooted at `session_root`.
    ///
    /// The root is only the session default; each fetch writes into its own
    /// destination directory.
    pub async fn new(session_root: PathBuf) -> Result<Self, FetchError> {
        if !session_root.exists() {
            std::fs::create_dir_all(&session_root).map_err(|e| {
                FetchError::EngineFailed(format!("Failed to create session root: {}", e))
            })?;
        }

        info!(session_root = %session_root.display(), "Initializing librqbit session");

        let session = Session::new(session_root)
            .await
            .map_err(|e| FetchError::EngineFailed(format!("Failed to initialize session: {}", e)))?;

        Ok(Self { session })
    }
}

#[async_trait]
impl Fetcher for LibrqbitFetcher {
    fn name(&self) -> &str {
        "librqbit"
    }

    async fn fetch(
        &self,
        descriptor_path: &Path,
        dest_dir: &Path,
        mut cancel: oneshot::Receiver<()>,
    ) -> Result<FetchOutcome, FetchError> {
        let bytes = tokio::fs::read(descriptor_path)
            .await
            .map_err(|e| FetchError::DescriptorUnreadable(e.to_string()))?;

        tokio::fs::create_dir_all(dest_dir).await?;

        let opts = AddTorrentOptions {
            output_folder: Some(dest_dir.to_string_lossy().to_string()),
            ..Default::default()
        };

        let response = self
            .session
            .add_torrent(AddTorrent::from_bytes(bytes), Some(opts))
            .await
            .map_err(|e| FetchError::InvalidDescriptor(format!("Failed to add torrent: {}", e)))?;

        let handle = match response {
            AddTorrentResponse::Added(_, handle) => handle,
            AddTorrentResponse::AlreadyManaged(_, handle) => {
                warn!(descriptor = %descriptor_path.display(), "Torrent already managed, reusing");
                handle
            }
            AddTorrentResponse::ListOnly(_) => {
                return Err(FetchError::EngineFailed(
                    "Torrent was added in list-only mode".to_string(),
                ));
            }
        };

        let hash = handle.info_hash().as_string();
        debug!(hash = %hash, dest = %dest_dir.display(), "Download started");

        tokio::select! {
            result = handle.wait_until_completed() => {
                result.map_err(|e| FetchError::EngineFailed(format!("Download failed: {}", e)))?;
                info!(hash = %hash, "Download completed");
                Ok(FetchOutcome::Completed)
            }
            _ = &mut cancel => {
                // Stop the transfer but keep whatever landed on disk; the
                // cleanup prompt decides its fate.
                let id = handle.id();
                if let Err(e) = self.session.delete(id.into(), false).await {
                    warn!(hash = %hash, error = %e, "Failed to remove cancelled torrent");
                }
                info!(hash = %hash, "Download cancelled");
                Ok(FetchOutcome::Cancelled)
            }
        }
    }
}
