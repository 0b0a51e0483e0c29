//! Error types for the transcode engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during transcoding.
#[derive(Debug, Error)]
pub enum EngineError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Output directory does not exist and could not be created.
    #[error("Failed to create output directory: {path}")]
    OutputDirectoryFailed { path: PathBuf },

    /// Transcode process failed.
    #[error("Transcode failed: {reason}")]
    TranscodeFailed {
        reason: String,
        /// Trailing portion of the engine's stderr, already bounded.
        stderr_tail: Option<String>,
    },

    /// Transcode timed out.
    #[error("Transcode timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// I/O error during transcoding.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates a transcode failure with captured stderr.
    pub fn transcode_failed(reason: impl Into<String>, stderr_tail: Option<String>) -> Self {
        Self::TranscodeFailed {
            reason: reason.into(),
            stderr_tail,
        }
    }

    /// The diagnostic text shown to the user, bounded by construction.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::TranscodeFailed {
                reason,
                stderr_tail: Some(tail),
            } if !tail.is_empty() => format!("{}\n{}", reason, tail),
            other => other.to_string(),
        }
    }
}
