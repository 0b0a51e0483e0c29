//! Pipeline state machine.
//!
//! The core of the system: drives one session per user from descriptor
//! submission through download, inspection, optional preview, conversion,
//! delivery, and cleanup. Each session is owned by its own actor task and
//! processes external events (user decisions, download completion,
//! cancellation) strictly one at a time; sessions for different users never
//! share mutable state.

mod machine;
mod session;
mod types;

pub use machine::SessionPipeline;
pub use session::{
    is_video_file, resolve_asset_dir, video_files, Session, SessionPaths, VIDEO_EXTENSIONS,
};
pub use types::{PipelineError, SessionEvent, Stage, TerminalState};
