//! Types for the transcode engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Video codec choice for one conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// Stream-copy the video track unchanged.
    Copy,
    /// Re-encode with H.264.
    H264,
}

impl VideoCodec {
    /// Returns the ffmpeg codec name for this choice.
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::H264 => "libx264",
        }
    }
}

/// Which audio track a conversion uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSelection {
    /// The engine's default audio stream.
    Default,
    /// An explicit 0-based audio stream index.
    Track(usize),
}

/// A video scale filter, expressed in ffmpeg scale expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleFilter {
    pub width_expr: String,
    pub height_expr: String,
}

impl ScaleFilter {
    /// Halves linear dimensions (quarter area), rounded to even integers.
    pub fn half_linear() -> Self {
        Self {
            width_expr: "round(iw/4)*2".to_string(),
            height_expr: "round(ih/4)*2".to_string(),
        }
    }

    /// Renders the full `-vf` argument value.
    pub fn ffmpeg_filter(&self) -> String {
        format!("scale={}:{}", self.width_expr, self.height_expr)
    }
}

/// A fully-resolved conversion request for one file.
///
/// Output is always an mp4 container with fast-start metadata placement,
/// aac audio, shortest-stream semantics, overwriting any pre-existing file
/// at the target path. Those are invariants of the engine, not options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSpec {
    /// Input file path.
    pub input_path: PathBuf,
    /// Output file path.
    pub output_path: PathBuf,
    /// Read start offset in seconds (preview clips).
    pub start_secs: Option<f64>,
    /// Output duration cap in seconds (preview clips).
    pub max_duration_secs: Option<u32>,
    /// Video codec choice.
    pub video_codec: VideoCodec,
    /// Optional scale-down filter.
    pub scale: Option<ScaleFilter>,
    /// Audio track selection.
    pub audio: AudioSelection,
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeOutput {
    /// Output file path.
    pub output_path: PathBuf,
    /// Output file size in bytes.
    pub output_size_bytes: u64,
    /// Wall-clock conversion duration in milliseconds.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_codec_names() {
        assert_eq!(VideoCodec::Copy.ffmpeg_codec(), "copy");
        assert_eq!(VideoCodec::H264.ffmpeg_codec(), "libx264");
    }

    #[test]
    fn test_scale_filter_rendering() {
        let filter = ScaleFilter::half_linear();
        assert_eq!(filter.ffmpeg_filter(), "scale=round(iw/4)*2:round(ih/4)*2");
    }

    #[test]
    fn test_encode_spec_serialization() {
        let spec = EncodeSpec {
            input_path: PathBuf::from("/in.mkv"),
            output_path: PathBuf::from("/out.mp4"),
            start_secs: Some(12.5),
            max_duration_secs: Some(120),
            video_codec: VideoCodec::H264,
            scale: Some(ScaleFilter::half_linear()),
            audio: AudioSelection::Track(1),
        };
        let json = serde_json::to_string(&spec).unwrap();
        let parsed: EncodeSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, spec);
    }
}
