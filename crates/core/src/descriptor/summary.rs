//! Descriptor summary parsing and rendering.

use std::path::Path;

use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maximum number of file entries kept in a summary.
const MAX_LISTED_ENTRIES: usize = 10;

/// One listed file inside a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentEntry {
    /// Path relative to the torrent root.
    pub path: String,
    /// File size in bytes.
    pub size_bytes: u64,
}

/// Read-only snapshot of a torrent descriptor, computed once at submission.
///
/// `total_bytes` and `file_count` are `None` when metainfo parsing failed;
/// the summary itself is always produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TorrentSummary {
    /// Total payload size in bytes, if the descriptor parsed.
    pub total_bytes: Option<u64>,
    /// Number of files, if the descriptor parsed.
    pub file_count: Option<usize>,
    /// Up to the first 10 file entries.
    pub entries: Vec<TorrentEntry>,
    /// How many entries were omitted from `entries`.
    pub omitted: usize,
}

impl TorrentSummary {
    /// A summary for a descriptor that could not be parsed.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Renders the confirmation prompt shown after submission.
    pub fn render_prompt(&self, descriptor_name: &str) -> String {
        let size_str = match self.total_bytes {
            Some(bytes) => format!("{:.2} GB", bytes as f64 / (1024f64 * 1024.0 * 1024.0)),
            None => "unknown".to_string(),
        };
        let count_str = match self.file_count {
            Some(count) => count.to_string(),
            None => "unknown".to_string(),
        };

        let mut text = format!(
            "Torrent: {}\nTotal size: {}\nFile count: {}\n",
            descriptor_name, size_str, count_str
        );

        if !self.entries.is_empty() {
            text.push_str("\nFiles:\n");
            let lines: Vec<String> = self
                .entries
                .iter()
                .map(|e| {
                    format!(
                        "- {} ({:.2} MB)",
                        e.path,
                        e.size_bytes as f64 / (1024f64 * 1024.0)
                    )
                })
                .collect();
            text.push_str(&lines.join("\n"));
            if self.omitted > 0 {
                text.push_str(&format!("\n… and {} more", self.omitted));
            }
        }

        text
    }
}

/// Summarizes a descriptor file, degrading to [`TorrentSummary::unknown`]
/// when the file cannot be read or parsed.
pub async fn summarize_descriptor(path: &Path) -> TorrentSummary {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Failed to read descriptor");
            return TorrentSummary::unknown();
        }
    };

    match parse_summary(&bytes) {
        Ok(summary) => summary,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Failed to parse descriptor");
            TorrentSummary::unknown()
        }
    }
}

fn parse_summary(bytes: &[u8]) -> anyhow::Result<TorrentSummary> {
    let meta: TorrentMetaV1<&[u8]> = torrent_from_bytes(bytes)?;

    let mut total_bytes = 0u64;
    let mut file_count = 0usize;
    let mut entries = Vec::new();

    for details in meta.info.iter_file_details()? {
        total_bytes += details.len;
        file_count += 1;
        if entries.len() < MAX_LISTED_ENTRIES {
            entries.push(TorrentEntry {
                path: details.filename.to_vec()?.join("/"),
                size_bytes: details.len,
            });
        }
    }

    Ok(TorrentSummary {
        total_bytes: Some(total_bytes),
        file_count: Some(file_count),
        omitted: file_count.saturating_sub(entries.len()),
        entries,
    })
}
