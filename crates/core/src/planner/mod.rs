//! Transcode planning.
//!
//! Pure decision logic that turns an input file's size and duration plus the
//! job intent into a fully-resolved [`EncodeSpec`]. The rules bound resource
//! use and must stay exactly as specified:
//!
//! - above 4000 MiB the video is scaled to half its linear dimensions
//!   (quarter area, even integers); otherwise no scaling
//! - above 2000 MiB the video is re-encoded (H.264); otherwise stream-copied
//! - audio is always re-encoded, either an explicit track or the engine's
//!   default stream
//! - previews start at 10% of the duration (0 when unknown) and cap the
//!   output at 120 seconds
//!
//! No I/O happens here; callers supply the size and duration they already
//! have from the filesystem and the inspector.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::converter::{AudioSelection, EncodeSpec, ScaleFilter, VideoCodec};

/// Inputs above this size get scaled down.
const SCALE_THRESHOLD_MIB: u64 = 4000;

/// Inputs above this size get re-encoded instead of stream-copied.
const REENCODE_THRESHOLD_MIB: u64 = 2000;

/// Maximum preview clip length in seconds.
const PREVIEW_MAX_SECS: u32 = 120;

/// Previews start this far into the input.
const PREVIEW_START_FRACTION: f64 = 0.10;

/// Whether a conversion produces a short preview or the full media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeIntent {
    Preview,
    Full,
}

/// What the planner knows about an input file.
#[derive(Debug, Clone, Copy)]
pub struct PlanInput {
    /// Input file size in bytes.
    pub size_bytes: u64,
    /// Input duration in seconds, when known and positive.
    pub duration_secs: Option<f64>,
}

/// Plans one conversion.
pub fn plan(
    input_path: &Path,
    output_path: &Path,
    input: PlanInput,
    intent: EncodeIntent,
    audio: AudioSelection,
) -> EncodeSpec {
    let size_mib = input.size_bytes >> 20;

    let scale = if size_mib > SCALE_THRESHOLD_MIB {
        Some(ScaleFilter::half_linear())
    } else {
        None
    };

    let video_codec = if size_mib > REENCODE_THRESHOLD_MIB {
        VideoCodec::H264
    } else {
        VideoCodec::Copy
    };

    let (start_secs, max_duration_secs) = match intent {
        EncodeIntent::Preview => {
            let start = input
                .duration_secs
                .filter(|d| *d > 0.0)
                .map(|d| d * PREVIEW_START_FRACTION)
                .unwrap_or(0.0);
            (Some(start), Some(PREVIEW_MAX_SECS))
        }
        EncodeIntent::Full => (None, None),
    };

    EncodeSpec {
        input_path: input_path.to_path_buf(),
        output_path: output_path.to_path_buf(),
        start_secs,
        max_duration_secs,
        video_codec,
        scale,
        audio,
    }
}

/// Dimensions produced by the scale-down filter: half linear size, rounded
/// to even integers.
pub fn scaled_dimensions(width: u32, height: u32) -> (u32, u32) {
    let scale = |dim: u32| ((dim as f64 / 4.0).round() as u32) * 2;
    (scale(width), scale(height))
}
