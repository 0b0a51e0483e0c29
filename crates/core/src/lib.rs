//! Chat-driven torrent to media delivery pipeline.
//!
//! A user submits a torrent descriptor; the pipeline confirms it, downloads
//! the content, inspects the media, optionally renders a short preview,
//! converts every video file, delivers the results, and cleans up. All of
//! that runs as one long-lived, interruptible job per user, driven by the
//! [`pipeline::SessionPipeline`] state machine.
//!
//! External collaborators sit behind traits: [`fetcher::Fetcher`] (librqbit
//! implementation), [`converter::TranscodeEngine`] (ffmpeg),
//! [`inspector::Inspector`] (ffprobe), and [`gateway::Messenger`] (test
//! double; the production transport lives with the deployment).

pub mod config;
pub mod converter;
pub mod delivery;
pub mod descriptor;
pub mod fetcher;
pub mod gateway;
pub mod inspector;
pub mod pipeline;
pub mod planner;
pub mod testing;
