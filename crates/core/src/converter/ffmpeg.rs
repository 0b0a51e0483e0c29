//! FFmpeg-based transcode engine implementation.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::config::EngineConfig;
use super::error::EngineError;
use super::traits::TranscodeEngine;
use super::types::{AudioSelection, EncodeSpec, TranscodeOutput};

/// Audio is always re-encoded to this codec.
const AUDIO_CODEC: &str = "aac";

/// Upper bound on the stderr excerpt carried in failures.
const DIAGNOSTIC_TAIL_BYTES: usize = 1200;

/// FFmpeg-based transcode engine.
pub struct FfmpegEngine {
    config: EngineConfig,
}

impl FfmpegEngine {
    /// Creates a new FFmpeg engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Creates an engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Builds the ffmpeg argument list for a spec.
    fn build_args(&self, spec: &EncodeSpec) -> Vec<String> {
        let mut args = vec!["-y".to_string()];

        // Input seeking, before -i
        if let Some(start) = spec.start_secs {
            args.extend(["-ss".to_string(), format!("{:.3}", start)]);
        }

        args.extend([
            "-i".to_string(),
            spec.input_path.to_string_lossy().to_string(),
        ]);

        if let Some(ref scale) = spec.scale {
            args.extend(["-vf".to_string(), scale.ffmpeg_filter()]);
        }

        // An explicit track needs explicit mapping; otherwise ffmpeg's
        // default stream selection picks the best video and audio stream.
        if let AudioSelection::Track(index) = spec.audio {
            args.extend([
                "-map".to_string(),
                "0:v:0".to_string(),
                "-map".to_string(),
                format!("0:a:{}", index),
            ]);
        }

        args.extend([
            "-c:v".to_string(),
            spec.video_codec.ffmpeg_codec().to_string(),
            "-c:a".to_string(),
            AUDIO_CODEC.to_string(),
        ]);

        if let Some(cap) = spec.max_duration_secs {
            args.extend(["-t".to_string(), cap.to_string()]);
        }

        args.extend([
            "-shortest".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-f".to_string(),
            "mp4".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(spec.output_path.to_string_lossy().to_string());

        args
    }
}

/// Returns the trailing portion of `text`, at most `max` bytes, on a char
/// boundary.
fn tail_of(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}

#[async_trait]
impl TranscodeEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn transcode(&self, spec: EncodeSpec) -> Result<TranscodeOutput, EngineError> {
        let start = Instant::now();

        if !spec.input_path.exists() {
            return Err(EngineError::InputNotFound {
                path: spec.input_path.clone(),
            });
        }

        // Ensure output directory exists
        if let Some(parent) = spec.output_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|_| {
                EngineError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                }
            })?;
        }

        let args = self.build_args(&spec);
        debug!(input = %spec.input_path.display(), output = %spec.output_path.display(), "Starting ffmpeg");

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    EngineError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    EngineError::Io(e)
                }
            })?;

        let stderr = child.stderr.take().expect("stderr should be captured");
        let mut reader = BufReader::new(stderr).lines();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            // Keep only a bounded tail of stderr for diagnostics.
            let mut lines: Vec<String> = Vec::new();
            let mut total = 0usize;

            while let Ok(Some(line)) = reader.next_line().await {
                total += line.len() + 1;
                lines.push(line);
                while total > DIAGNOSTIC_TAIL_BYTES && lines.len() > 1 {
                    total -= lines.remove(0).len() + 1;
                }
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, lines.join("\n")))
        })
        .await;

        match result {
            Ok(Ok((status, stderr_text))) => {
                if !status.success() {
                    let tail = tail_of(&stderr_text, DIAGNOSTIC_TAIL_BYTES).to_string();
                    return Err(EngineError::transcode_failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        if tail.is_empty() { None } else { Some(tail) },
                    ));
                }
            }
            Ok(Err(e)) => return Err(EngineError::Io(e)),
            Err(_) => {
                // Kill the process on timeout
                let _ = child.kill().await;
                return Err(EngineError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        // Verify output exists and get size
        let output_meta = tokio::fs::metadata(&spec.output_path)
            .await
            .map_err(|_| EngineError::transcode_failed("Output file not created", None))?;

        Ok(TranscodeOutput {
            output_path: spec.output_path.clone(),
            output_size_bytes: output_meta.len(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn validate(&self) -> Result<(), EngineError> {
        let result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(EngineError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(EngineError::Io(e));
        }

        Ok(())
    }
}
