//! Transcode engine boundary.
//!
//! This module defines the fully-resolved [`EncodeSpec`] handed to the
//! engine for one conversion, the [`TranscodeEngine`] trait, and the
//! FFmpeg-backed implementation.
//!
//! The engine does not decide encoding parameters; that is the planner's
//! job. Every spec it receives already carries the codec, scaling, track
//! and clipping choices.

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::EngineConfig;
pub use error::EngineError;
pub use ffmpeg::FfmpegEngine;
pub use traits::TranscodeEngine;
pub use types::{AudioSelection, EncodeSpec, ScaleFilter, TranscodeOutput, VideoCodec};
