//! Types for the pipeline state machine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::converter::EngineError;
use crate::fetcher::{FetchError, FetchOutcome};
use crate::gateway::Decision;

/// How a finished session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Completed,
    Cancelled,
    Failed,
}

/// Position of a session within the pipeline.
///
/// Stages advance strictly forward; the optional stages
/// (`AwaitingAudioSelection`, `PreviewProcessing`) are skipped when their
/// precondition does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AwaitingAcceptance,
    Downloading,
    AwaitingAudioSelection,
    AwaitingPreviewDecision,
    PreviewProcessing,
    AwaitingUploadDecision,
    Converting,
    Delivering,
    AwaitingCleanupDecision,
    Terminal(TerminalState),
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Terminal(_))
    }
}

/// One external event routed into a session's actor.
#[derive(Debug)]
pub enum SessionEvent {
    /// A button-press decision from the user.
    Decision(Decision),
    /// The background download task finished, one way or another.
    DownloadFinished(Result<FetchOutcome, FetchError>),
    /// The user asked to cancel whatever is in flight.
    CancelRequested,
}

/// Pipeline failure taxonomy.
///
/// Input rejections happen before a session exists; the rest terminate a
/// session. Working directories stay in place on fatal errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("User {user_id} is not authorized")]
    Unauthorized { user_id: String },

    #[error("Invalid submission: {0}")]
    InvalidSubmission(String),

    #[error("A session is already in progress for user {user_id}")]
    SessionInProgress { user_id: String },

    #[error("Ambiguous download layout: found {count} directories")]
    AmbiguousLayout { count: usize },

    #[error("No video files found in the downloaded content")]
    NoVideoFiles,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Transcode(#[from] EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
