//! Types for the media inspector.

use serde::{Deserialize, Serialize};

/// One audio track of a media file, with a human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// 0-based index matching the engine's audio stream ordering.
    pub index: usize,
    /// Generated descriptive label.
    pub label: String,
}

impl AudioTrack {
    /// Builds a track with its label composed from stream metadata.
    ///
    /// Label shape: `"{title}: Track {n+1} ({lang}, {codec}, {channels}ch,
    /// {layout})"` where the title prefix appears only when a title exists
    /// and empty fields drop out of the comma-joined list.
    pub fn new(
        index: usize,
        title: Option<&str>,
        language: Option<&str>,
        codec: Option<&str>,
        channels: Option<u32>,
        layout: Option<&str>,
    ) -> Self {
        let mut core = Vec::new();
        if let Some(lang) = language.filter(|l| !l.is_empty()) {
            core.push(lang.to_lowercase());
        }
        if let Some(codec) = codec.filter(|c| !c.is_empty()) {
            core.push(codec.to_string());
        }
        if let Some(channels) = channels {
            core.push(format!("{}ch", channels));
        }
        if let Some(layout) = layout.filter(|l| !l.is_empty()) {
            core.push(layout.to_string());
        }

        let prefix = match title.filter(|t| !t.is_empty()) {
            Some(title) => format!("{}: ", title),
            None => String::new(),
        };

        Self {
            index,
            label: format!("{}Track {} ({})", prefix, index + 1, core.join(", ")),
        }
    }
}

/// Result of inspecting a media file.
///
/// All fields are best-effort; `degraded()` is what callers get when
/// probing fails outright.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaProbe {
    /// Container duration in seconds, when known and positive.
    pub duration_secs: Option<f64>,
    /// Frame width of the first video stream, when known.
    pub width: Option<u32>,
    /// Frame height of the first video stream, when known.
    pub height: Option<u32>,
    /// Container title tag, empty when absent.
    pub title: String,
    /// Audio tracks in stream order.
    pub audio_tracks: Vec<AudioTrack>,
}

impl MediaProbe {
    /// The probe reported when inspection fails.
    pub fn degraded() -> Self {
        Self::default()
    }

    /// Renders `WxH`, with `unknown` standing in for missing dimensions.
    ///
    /// Callers that want to omit dimensions entirely should check
    /// `width`/`height` instead.
    pub fn dimensions_label(&self) -> String {
        match (self.width, self.height) {
            (Some(w), Some(h)) => format!("{}x{}", w, h),
            _ => "unknown".to_string(),
        }
    }
}
