//! Media inspection.
//!
//! Extracts duration, frame dimensions, container title and labelled audio
//! tracks from a media file. Inspection is never fatal to a job: when
//! probing fails the inspector reports a degraded probe (no title, no
//! tracks, unknown dimensions) and the pipeline simply skips audio-track
//! choice and dimension reporting.

mod ffprobe;
mod traits;
mod types;

pub use ffprobe::FfprobeInspector;
pub use traits::Inspector;
pub use types::{AudioTrack, MediaProbe};
