//! Torrent descriptor summarization.
//!
//! Builds a read-only [`TorrentSummary`] snapshot from a .torrent file at
//! submission time. Parsing is strictly best-effort: a descriptor that the
//! metainfo parser rejects still yields a summary, with size and count
//! reported as unknown.

mod summary;

pub use summary::{summarize_descriptor, TorrentEntry, TorrentSummary};
