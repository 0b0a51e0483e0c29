//! Session entity and asset resolution.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::descriptor::TorrentSummary;
use crate::inspector::MediaProbe;

use super::types::{PipelineError, Stage};

/// Recognized video file extensions, matched case-insensitively.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "m4v"];

/// Per-session working directories, all exclusive to one session.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    /// The submitted .torrent file.
    pub descriptor_path: PathBuf,
    /// Where the download engine writes.
    pub download_dir: PathBuf,
    /// Where preview clips are rendered.
    pub preview_dir: PathBuf,
    /// Where full conversions land before delivery.
    pub delivery_dir: PathBuf,
}

impl SessionPaths {
    pub fn new(work_root: &Path, session_id: Uuid, descriptor_path: PathBuf) -> Self {
        let id = session_id.to_string();
        Self {
            descriptor_path,
            download_dir: work_root.join("downloads").join(&id),
            preview_dir: work_root.join("preview").join(&id),
            delivery_dir: work_root.join("delivery").join(&id),
        }
    }
}

/// One user's in-flight job.
///
/// Mutated exclusively by its actor task, one event at a time. The download
/// cancel sender is present only during the Downloading stage.
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub chat_id: String,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub paths: SessionPaths,
    pub summary: TorrentSummary,
    /// Resolved asset directory, set after download completion.
    pub media_dir: Option<PathBuf>,
    /// Probe of the first video file, set after asset resolution.
    pub probe: Option<MediaProbe>,
    /// Explicitly chosen audio track index.
    pub selected_audio: Option<usize>,
    /// Set when the user cancelled while the download was active.
    pub cancel_requested: bool,
    /// Signals the active download task to stop.
    pub download_cancel: Option<oneshot::Sender<()>>,
}

impl Session {
    pub fn new(
        user_id: String,
        chat_id: String,
        work_root: &Path,
        descriptor_path: PathBuf,
        summary: TorrentSummary,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            user_id,
            chat_id,
            stage: Stage::AwaitingAcceptance,
            created_at: Utc::now(),
            paths: SessionPaths::new(work_root, id, descriptor_path),
            summary,
            media_dir: None,
            probe: None,
            selected_audio: None,
            cancel_requested: false,
            download_cancel: None,
        }
    }

    /// Name of the submitted descriptor file, for user-facing text.
    pub fn descriptor_name(&self) -> String {
        self.paths
            .descriptor_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "torrent".to_string())
    }
}

/// Whether a path looks like a video file by extension.
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lowered = e.to_lowercase();
            VIDEO_EXTENSIONS.iter().any(|v| *v == lowered)
        })
        .unwrap_or(false)
}

/// Resolves the asset directory after a completed download.
///
/// Zero subdirectories means the download directory itself holds the media;
/// exactly one means the content lives in that subdirectory; two or more is
/// an ambiguous layout and fatal regardless of contents.
pub fn resolve_asset_dir(download_dir: &Path) -> Result<PathBuf, PipelineError> {
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(download_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
        }
    }

    match subdirs.len() {
        0 => Ok(download_dir.to_path_buf()),
        1 => Ok(subdirs.remove(0)),
        count => Err(PipelineError::AmbiguousLayout { count }),
    }
}

/// Lists the video files directly contained in `dir`, sorted by filename.
pub fn video_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && is_video_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_video_file_case_insensitive() {
        assert!(is_video_file(Path::new("/a/movie.mkv")));
        assert!(is_video_file(Path::new("/a/Movie.MKV")));
        assert!(is_video_file(Path::new("/a/clip.Mp4")));
        assert!(is_video_file(Path::new("/a/clip.m4v")));
        assert!(!is_video_file(Path::new("/a/notes.txt")));
        assert!(!is_video_file(Path::new("/a/noext")));
    }

    #[test]
    fn test_resolve_zero_subdirs_is_download_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("movie.mkv"), b"x").unwrap();
        let resolved = resolve_asset_dir(dir.path()).unwrap();
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn test_resolve_single_subdir() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("Movie.2024");
        fs::create_dir(&inner).unwrap();
        fs::write(dir.path().join("readme.txt"), b"x").unwrap();
        let resolved = resolve_asset_dir(dir.path()).unwrap();
        assert_eq!(resolved, inner);
    }

    #[test]
    fn test_resolve_two_subdirs_is_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        let result = resolve_asset_dir(dir.path());
        assert!(matches!(
            result,
            Err(PipelineError::AmbiguousLayout { count: 2 })
        ));
    }

    #[test]
    fn test_video_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.mkv"), b"x").unwrap();
        fs::write(dir.path().join("a.mp4"), b"x").unwrap();
        fs::write(dir.path().join("notes.nfo"), b"x").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("c.mkv"), b"x").unwrap();

        let files = video_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        // Direct children only, in sorted order
        assert_eq!(names, ["a.mp4", "b.mkv"]);
    }

    #[test]
    fn test_session_paths_under_work_root() {
        let id = Uuid::new_v4();
        let paths = SessionPaths::new(
            Path::new("/data"),
            id,
            PathBuf::from("/data/torrents/x.torrent"),
        );
        assert!(paths.download_dir.starts_with("/data/downloads"));
        assert!(paths.preview_dir.starts_with("/data/preview"));
        assert!(paths.delivery_dir.starts_with("/data/delivery"));
        assert!(paths.download_dir.ends_with(id.to_string()));
    }

    #[test]
    fn test_descriptor_name() {
        let session = Session::new(
            "u1".to_string(),
            "c1".to_string(),
            Path::new("/data"),
            PathBuf::from("/tmp/incoming/movie.torrent"),
            TorrentSummary::unknown(),
        );
        assert_eq!(session.descriptor_name(), "movie.torrent");
        assert_eq!(session.stage, Stage::AwaitingAcceptance);
        assert!(!session.cancel_requested);
        assert!(session.created_at <= Utc::now());
    }
}
