//! ffprobe-based inspector implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use super::traits::Inspector;
use super::types::{AudioTrack, MediaProbe};

/// Inspector that shells out to ffprobe with JSON output.
pub struct FfprobeInspector {
    ffprobe_path: PathBuf,
}

impl FfprobeInspector {
    /// Creates an inspector using the given ffprobe binary.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// Creates an inspector that resolves `ffprobe` from PATH.
    pub fn with_defaults() -> Self {
        Self::new(PathBuf::from("ffprobe"))
    }

    /// Parses ffprobe JSON output into a probe result.
    fn parse_probe_output(output: &str) -> Result<MediaProbe, serde_json::Error> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            #[serde(default)]
            format: Option<ProbeFormat>,
            #[serde(default)]
            streams: Vec<ProbeStream>,
        }

        #[derive(Deserialize, Default)]
        struct ProbeFormat {
            duration: Option<String>,
            #[serde(default)]
            tags: ProbeTags,
        }

        #[derive(Deserialize, Default)]
        struct ProbeTags {
            title: Option<String>,
            language: Option<String>,
        }

        #[derive(Deserialize)]
        struct ProbeStream {
            codec_type: String,
            codec_name: Option<String>,
            codec_long_name: Option<String>,
            width: Option<u32>,
            height: Option<u32>,
            channels: Option<u32>,
            channel_layout: Option<String>,
            #[serde(default)]
            tags: ProbeTags,
        }

        let probe: ProbeOutput = serde_json::from_str(output)?;

        let format = probe.format.unwrap_or_default();
        let duration_secs = format
            .duration
            .as_ref()
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| *d > 0.0);
        let title = format.tags.title.unwrap_or_default();

        let video_stream = probe.streams.iter().find(|s| s.codec_type == "video");

        let audio_tracks: Vec<AudioTrack> = probe
            .streams
            .iter()
            .filter(|s| s.codec_type == "audio")
            .enumerate()
            .map(|(index, s)| {
                AudioTrack::new(
                    index,
                    s.tags.title.as_deref(),
                    s.tags.language.as_deref(),
                    s.codec_long_name.as_deref().or(s.codec_name.as_deref()),
                    s.channels,
                    s.channel_layout.as_deref(),
                )
            })
            .collect();

        Ok(MediaProbe {
            duration_secs,
            width: video_stream.and_then(|s| s.width),
            height: video_stream.and_then(|s| s.height),
            title,
            audio_tracks,
        })
    }
}

#[async_trait]
impl Inspector for FfprobeInspector {
    fn name(&self) -> &str {
        "ffprobe"
    }

    async fn inspect(&self, path: &Path) -> MediaProbe {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await;

        let output = match output {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!(
                    path = %path.display(),
                    code = ?output.status.code(),
                    "ffprobe exited with failure, degrading"
                );
                return MediaProbe::degraded();
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ffprobe failed to run, degrading");
                return MediaProbe::degraded();
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        match Self::parse_probe_output(&stdout) {
            Ok(probe) => probe,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ffprobe output unparsable, degrading");
                MediaProbe::degraded()
            }
        }
    }
}
