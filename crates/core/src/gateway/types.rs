//! Types for the messaging gateway.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to the messaging service.
#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error: {0}")]
    ApiError(String),
}

/// A user decision arriving from an inline keyboard button.
///
/// The wire format is a namespaced tag (`accept:yes`, `audio:3`, ...).
/// Parsing happens once at the gateway edge; everything past it dispatches
/// on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Decision {
    /// `accept:{yes|no}` — proceed with the submitted descriptor.
    Accept(bool),
    /// `audio:<index>` — chosen audio track.
    AudioTrack(usize),
    /// `preview:{yes|no}` — create a short preview clip.
    Preview(bool),
    /// `upload:{yes|no}` — convert and deliver the full media.
    Upload(bool),
    /// `cleanup:{yes|no}` — remove the working directory.
    Cleanup(bool),
}

impl Decision {
    /// Parses a namespaced callback tag. Returns `None` for unknown
    /// namespaces or malformed values.
    pub fn parse(data: &str) -> Option<Self> {
        let (namespace, value) = data.split_once(':')?;
        match namespace {
            "accept" => parse_yes_no(value).map(Decision::Accept),
            "audio" => value.parse::<usize>().ok().map(Decision::AudioTrack),
            "preview" => parse_yes_no(value).map(Decision::Preview),
            "upload" => parse_yes_no(value).map(Decision::Upload),
            "cleanup" => parse_yes_no(value).map(Decision::Cleanup),
            _ => None,
        }
    }

    /// Renders the decision back into its wire tag.
    pub fn callback_data(&self) -> String {
        match self {
            Decision::Accept(v) => format!("accept:{}", yes_no(*v)),
            Decision::AudioTrack(idx) => format!("audio:{}", idx),
            Decision::Preview(v) => format!("preview:{}", yes_no(*v)),
            Decision::Upload(v) => format!("upload:{}", yes_no(*v)),
            Decision::Cleanup(v) => format!("cleanup:{}", yes_no(*v)),
        }
    }
}

fn parse_yes_no(value: &str) -> Option<bool> {
    match value {
        "yes" => Some(true),
        "no" => Some(false),
        _ => None,
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// One button of an inline choice keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Human-readable button label.
    pub label: String,
    /// Decision emitted when pressed.
    pub decision: Decision,
}

impl Choice {
    pub fn new(label: impl Into<String>, decision: Decision) -> Self {
        Self {
            label: label.into(),
            decision,
        }
    }

    /// The standard yes/no pair used by confirmation prompts.
    pub fn yes_no(
        yes_label: &str,
        no_label: &str,
        make: impl Fn(bool) -> Decision,
    ) -> Vec<Choice> {
        vec![
            Choice::new(yes_label, make(true)),
            Choice::new(no_label, make(false)),
        ]
    }
}

/// A video file handed to the gateway for delivery.
#[derive(Debug, Clone)]
pub struct VideoDelivery {
    /// Recipient chat id.
    pub chat_id: String,
    /// Path of the video file on disk.
    pub path: PathBuf,
    /// Filename shown to the recipient.
    pub filename: String,
    /// Caption text.
    pub caption: String,
    /// Frame width, when known.
    pub width: Option<u32>,
    /// Frame height, when known.
    pub height: Option<u32>,
    /// Duration in seconds, when known.
    pub duration_secs: Option<f64>,
}
