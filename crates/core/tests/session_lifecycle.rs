//! End-to-end session lifecycle tests against mock collaborators.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use mediaferry_core::config::load_config_from_str;
use mediaferry_core::converter::{AudioSelection, TranscodeEngine, VideoCodec};
use mediaferry_core::fetcher::Fetcher;
use mediaferry_core::gateway::{Decision, Messenger};
use mediaferry_core::inspector::{AudioTrack, Inspector, MediaProbe};
use mediaferry_core::pipeline::SessionPipeline;
use mediaferry_core::testing::{MockEngine, MockFetcher, MockInspector, MockMessenger};

const USER: &str = "100";
const CHAT: &str = "chat-100";

struct Harness {
    pipeline: SessionPipeline,
    messenger: Arc<MockMessenger>,
    work_root: TempDir,
}

impl Harness {
    fn new(fetcher: MockFetcher, engine: MockEngine, inspector: MockInspector) -> Self {
        let work_root = TempDir::new().unwrap();
        let config = load_config_from_str(&format!(
            r#"
work_root = "{}"

[gateway]
credential = "test-token"
"#,
            work_root.path().display()
        ))
        .unwrap();

        let messenger = Arc::new(MockMessenger::new());
        let pipeline = SessionPipeline::new(
            Arc::new(config),
            Arc::new(fetcher) as Arc<dyn Fetcher>,
            Arc::new(engine) as Arc<dyn TranscodeEngine>,
            Arc::new(inspector) as Arc<dyn Inspector>,
            Arc::clone(&messenger) as Arc<dyn Messenger>,
        );

        Self {
            pipeline,
            messenger,
            work_root,
        }
    }

    async fn submit(&self) {
        let descriptor = self.work_root.path().join("movie.torrent");
        tokio::fs::write(&descriptor, b"not real metainfo").await.unwrap();
        self.pipeline.submit(USER, CHAT, descriptor).await.unwrap();
    }

    async fn decide(&self, decision: Decision) {
        assert!(self.pipeline.dispatch(USER, decision).await);
    }

    /// Waits until the most recent prompt contains `text`.
    async fn wait_for_prompt(&self, text: &str) {
        let messenger = Arc::clone(&self.messenger);
        wait_until(|| {
            let messenger = Arc::clone(&messenger);
            let text = text.to_string();
            async move {
                messenger
                    .last_prompt()
                    .await
                    .map(|(_, t, _)| t.contains(&text))
                    .unwrap_or(false)
            }
        })
        .await;
    }

    async fn wait_for_text(&self, text: &str) {
        let messenger = Arc::clone(&self.messenger);
        wait_until(|| {
            let messenger = Arc::clone(&messenger);
            let text = text.to_string();
            async move {
                messenger
                    .sent_texts()
                    .await
                    .iter()
                    .any(|(_, t)| t.contains(&text))
            }
        })
        .await;
    }

    async fn wait_for_session_end(&self) {
        wait_until(|| async { self.pipeline.active_sessions().await == 0 }).await;
    }

    fn download_dir(&self) -> PathBuf {
        self.work_root.path().join("downloads")
    }
}

async fn wait_until<F, Fut>(mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..500 {
        if cond().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within timeout");
}

fn hd_probe(track_count: usize) -> MediaProbe {
    MediaProbe {
        duration_secs: Some(3600.0),
        width: Some(1920),
        height: Some(1080),
        title: "Movie".to_string(),
        audio_tracks: (0..track_count)
            .map(|i| AudioTrack::new(i, None, Some("eng"), Some("aac"), Some(2), Some("stereo")))
            .collect(),
    }
}

#[tokio::test]
async fn test_happy_path_without_preview() {
    let harness = Harness::new(
        MockFetcher::completing().with_files(vec!["Movie/movie.mkv"]),
        MockEngine::new(),
        MockInspector::returning(hd_probe(1)),
    );

    harness.submit().await;
    harness.wait_for_prompt("Start this download?").await;

    harness.decide(Decision::Accept(true)).await;
    // One audio track: the selection prompt is skipped.
    harness.wait_for_prompt("Create a short preview first?").await;

    harness.decide(Decision::Preview(false)).await;
    harness.wait_for_prompt("Remove the downloaded files?").await;

    harness.decide(Decision::Cleanup(true)).await;
    harness.wait_for_text("Downloaded files removed.").await;
    harness.wait_for_session_end().await;

    // Cleanup acceptance removed the session's download directory.
    let mut entries = tokio::fs::read_dir(harness.download_dir()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn test_full_flow_with_preview_and_upload() {
    let harness = Harness::new(
        MockFetcher::completing().with_files(vec!["Movie/movie.mkv"]),
        MockEngine::new(),
        MockInspector::returning(hd_probe(1)),
    );

    harness.submit().await;
    harness.wait_for_prompt("Start this download?").await;
    harness.decide(Decision::Accept(true)).await;
    harness.wait_for_prompt("Create a short preview first?").await;

    harness.decide(Decision::Preview(true)).await;
    harness.wait_for_prompt("Upload the full version?").await;

    let videos = harness.messenger.sent_videos().await;
    assert_eq!(videos.len(), 1);
    assert!(videos[0].caption.contains("Sample of movie.mkv"));
    assert!(videos[0].caption.contains("Original: 1920x1080"));
    assert_eq!(videos[0].duration_secs, Some(120.0));

    harness.decide(Decision::Upload(true)).await;
    harness.wait_for_prompt("Remove the downloaded files?").await;

    harness.wait_for_text("Successfully converted: movie.mkv").await;
    let videos = harness.messenger.sent_videos().await;
    assert_eq!(videos.len(), 2);
    assert_eq!(videos[1].filename, "movie.mkv.mp4");

    // Delivery directory is removed unconditionally after uploads.
    let delivery_root = harness.work_root.path().join("delivery");
    if delivery_root.exists() {
        assert!(delivery_root.read_dir().unwrap().next().is_none());
    }

    harness.decide(Decision::Cleanup(false)).await;
    harness.wait_for_text("Downloaded files kept.").await;
    harness.wait_for_session_end().await;

    // Rejecting cleanup keeps the downloaded files.
    let mut entries = tokio::fs::read_dir(harness.download_dir()).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_some());
}

#[tokio::test]
async fn test_preview_and_full_specs_planned_correctly() {
    // Shares the engine Arc with the pipeline to inspect recorded specs.
    let engine = Arc::new(MockEngine::new());
    let work_root = TempDir::new().unwrap();
    let config = load_config_from_str(&format!(
        "work_root = \"{}\"\n\n[gateway]\ncredential = \"t\"\n",
        work_root.path().display()
    ))
    .unwrap();
    let messenger = Arc::new(MockMessenger::new());
    let pipeline = SessionPipeline::new(
        Arc::new(config),
        Arc::new(MockFetcher::completing().with_files(vec!["Movie/movie.mkv"])),
        Arc::clone(&engine) as Arc<dyn TranscodeEngine>,
        Arc::new(MockInspector::returning(hd_probe(1))),
        Arc::clone(&messenger) as Arc<dyn Messenger>,
    );

    let descriptor = work_root.path().join("movie.torrent");
    tokio::fs::write(&descriptor, b"x").await.unwrap();
    pipeline.submit(USER, CHAT, descriptor).await.unwrap();
    assert!(pipeline.dispatch(USER, Decision::Accept(true)).await);

    let m = Arc::clone(&messenger);
    wait_until(|| {
        let m = Arc::clone(&m);
        async move {
            m.last_prompt()
                .await
                .map(|(_, t, _)| t.contains("preview"))
                .unwrap_or(false)
        }
    })
    .await;
    assert!(pipeline.dispatch(USER, Decision::Preview(true)).await);

    let m = Arc::clone(&messenger);
    wait_until(|| {
        let m = Arc::clone(&m);
        async move {
            m.last_prompt()
                .await
                .map(|(_, t, _)| t.contains("full version"))
                .unwrap_or(false)
        }
    })
    .await;
    assert!(pipeline.dispatch(USER, Decision::Upload(true)).await);

    let e = Arc::clone(&engine);
    wait_until(|| {
        let e = Arc::clone(&e);
        async move { e.recorded_specs().await.len() == 2 }
    })
    .await;

    let specs = engine.recorded_specs().await;
    // Preview: offset at 10% of one hour, capped at two minutes.
    assert_eq!(specs[0].start_secs, Some(360.0));
    assert_eq!(specs[0].max_duration_secs, Some(120));
    // Tiny mock file: no scaling, stream-copied video.
    assert_eq!(specs[0].scale, None);
    assert_eq!(specs[0].video_codec, VideoCodec::Copy);
    // Full conversion: no clipping.
    assert_eq!(specs[1].start_secs, None);
    assert_eq!(specs[1].max_duration_secs, None);
    assert_eq!(specs[1].audio, AudioSelection::Default);
}

#[tokio::test]
async fn test_audio_selection_for_multiple_tracks() {
    let engine = Arc::new(MockEngine::new());
    let work_root = TempDir::new().unwrap();
    let config = load_config_from_str(&format!(
        "work_root = \"{}\"\n\n[gateway]\ncredential = \"t\"\n",
        work_root.path().display()
    ))
    .unwrap();
    let messenger = Arc::new(MockMessenger::new());
    let pipeline = SessionPipeline::new(
        Arc::new(config),
        Arc::new(MockFetcher::completing().with_files(vec!["Movie/movie.mkv"])),
        Arc::clone(&engine) as Arc<dyn TranscodeEngine>,
        Arc::new(MockInspector::returning(hd_probe(3))),
        Arc::clone(&messenger) as Arc<dyn Messenger>,
    );

    let descriptor = work_root.path().join("movie.torrent");
    tokio::fs::write(&descriptor, b"x").await.unwrap();
    pipeline.submit(USER, CHAT, descriptor).await.unwrap();
    assert!(pipeline.dispatch(USER, Decision::Accept(true)).await);

    let m = Arc::clone(&messenger);
    wait_until(|| {
        let m = Arc::clone(&m);
        async move {
            m.last_prompt()
                .await
                .map(|(_, t, _)| t.contains("Select an audio track"))
                .unwrap_or(false)
        }
    })
    .await;

    // Exactly one selection prompt, headed by the sampled file and the
    // container title, listing every track in order.
    let (_, text, choices) = messenger.last_prompt().await.unwrap();
    assert!(text.starts_with("movie.mkv\nMovie\n"));
    assert_eq!(choices.len(), 3);
    assert_eq!(choices[0].decision, Decision::AudioTrack(0));
    assert_eq!(choices[2].decision, Decision::AudioTrack(2));
    assert!(choices[1].label.contains("Track 2"));

    assert!(pipeline.dispatch(USER, Decision::AudioTrack(1)).await);
    let m = Arc::clone(&messenger);
    wait_until(|| {
        let m = Arc::clone(&m);
        async move {
            m.last_prompt()
                .await
                .map(|(_, t, _)| t.contains("preview"))
                .unwrap_or(false)
        }
    })
    .await;
    assert!(pipeline.dispatch(USER, Decision::Preview(true)).await);

    let e = Arc::clone(&engine);
    wait_until(|| {
        let e = Arc::clone(&e);
        async move { !e.recorded_specs().await.is_empty() }
    })
    .await;

    // The chosen track flows into the encode spec.
    let specs = engine.recorded_specs().await;
    assert_eq!(specs[0].audio, AudioSelection::Track(1));
}

#[tokio::test]
async fn test_zero_audio_tracks_skips_selection() {
    // A degraded probe carries no audio tracks at all; like a single-track
    // file, that goes straight to the preview prompt.
    let harness = Harness::new(
        MockFetcher::completing().with_files(vec!["Movie/movie.mkv"]),
        MockEngine::new(),
        MockInspector::new(),
    );

    harness.submit().await;
    harness.wait_for_prompt("Start this download?").await;
    harness.decide(Decision::Accept(true)).await;
    harness.wait_for_prompt("Create a short preview first?").await;

    for (_, text, _) in harness.messenger.sent_prompts().await {
        assert!(!text.contains("audio track"));
    }
}

#[tokio::test]
async fn test_delivery_metadata_probed_per_file() {
    // The second output carries its own dimensions and duration; the first
    // output's probe is degraded, so it falls back to the source metadata.
    let harness = Harness::new(
        MockFetcher::completing().with_files(vec!["Movie/a.mkv", "Movie/b.mkv"]),
        MockEngine::new(),
        MockInspector::returning(hd_probe(1))
            .probe_for("a.mkv.mp4", MediaProbe::degraded())
            .probe_for(
                "b.mkv.mp4",
                MediaProbe {
                    duration_secs: Some(1800.0),
                    width: Some(1280),
                    height: Some(720),
                    title: String::new(),
                    audio_tracks: vec![],
                },
            ),
    );

    harness.submit().await;
    harness.wait_for_prompt("Start this download?").await;
    harness.decide(Decision::Accept(true)).await;
    harness.wait_for_prompt("Create a short preview first?").await;
    harness.decide(Decision::Preview(true)).await;
    harness.wait_for_prompt("Upload the full version?").await;
    harness.decide(Decision::Upload(true)).await;
    harness.wait_for_prompt("Remove the downloaded files?").await;

    let videos = harness.messenger.sent_videos().await;
    // Preview of a.mkv first, then the two full conversions in order.
    assert_eq!(videos.len(), 3);

    assert_eq!(videos[1].filename, "a.mkv.mp4");
    assert_eq!(videos[1].width, Some(1920));
    assert_eq!(videos[1].height, Some(1080));
    assert_eq!(videos[1].duration_secs, Some(3600.0));

    assert_eq!(videos[2].filename, "b.mkv.mp4");
    assert_eq!(videos[2].width, Some(1280));
    assert_eq!(videos[2].height, Some(720));
    assert_eq!(videos[2].duration_secs, Some(1800.0));
}

#[tokio::test]
async fn test_cancel_during_download_routes_to_cleanup() {
    let harness = Harness::new(
        MockFetcher::waiting_for_cancel(),
        MockEngine::new(),
        MockInspector::returning(hd_probe(2)),
    );

    harness.submit().await;
    harness.wait_for_prompt("Start this download?").await;
    harness.decide(Decision::Accept(true)).await;
    harness.wait_for_text("Download started.").await;

    harness.pipeline.request_cancel(USER, CHAT).await;
    harness.wait_for_text("Download cancelled.").await;
    harness.wait_for_prompt("Remove the downloaded files?").await;

    // Never asks about audio or preview after a cancellation.
    for (_, text, _) in harness.messenger.sent_prompts().await {
        assert!(!text.contains("audio"));
        assert!(!text.contains("preview"));
    }

    harness.decide(Decision::Cleanup(true)).await;
    harness.wait_for_session_end().await;
}

#[tokio::test]
async fn test_ambiguous_layout_is_fatal() {
    let harness = Harness::new(
        MockFetcher::completing().with_files(vec!["a/x.mkv", "b/y.mkv"]),
        MockEngine::new(),
        MockInspector::new(),
    );

    harness.submit().await;
    harness.wait_for_prompt("Start this download?").await;
    harness.decide(Decision::Accept(true)).await;

    harness.wait_for_text("2 directories").await;
    harness.wait_for_session_end().await;
}

#[tokio::test]
async fn test_no_video_files_is_fatal() {
    let harness = Harness::new(
        MockFetcher::completing().with_files(vec!["Movie/readme.txt", "Movie/cover.jpg"]),
        MockEngine::new(),
        MockInspector::new(),
    );

    harness.submit().await;
    harness.wait_for_prompt("Start this download?").await;
    harness.decide(Decision::Accept(true)).await;

    harness.wait_for_text("No video files were found").await;
    harness.wait_for_session_end().await;
}

#[tokio::test]
async fn test_download_failure_is_fatal() {
    let harness = Harness::new(
        MockFetcher::failing("no peers found"),
        MockEngine::new(),
        MockInspector::new(),
    );

    harness.submit().await;
    harness.wait_for_prompt("Start this download?").await;
    harness.decide(Decision::Accept(true)).await;

    harness.wait_for_text("Download failed").await;
    harness.wait_for_session_end().await;
}

#[tokio::test]
async fn test_transcode_failure_is_terminal_and_keeps_files() {
    let harness = Harness::new(
        MockFetcher::completing().with_files(vec!["Movie/a.mkv", "Movie/b.mkv"]),
        MockEngine::failing_inputs_containing("b.mkv", "codec not supported"),
        MockInspector::returning(hd_probe(1)),
    );

    harness.submit().await;
    harness.wait_for_prompt("Start this download?").await;
    harness.decide(Decision::Accept(true)).await;
    harness.wait_for_prompt("Create a short preview first?").await;
    harness.decide(Decision::Preview(true)).await;
    harness.wait_for_prompt("Upload the full version?").await;
    harness.decide(Decision::Upload(true)).await;

    harness.wait_for_text("Conversion failed for b.mkv").await;
    harness.wait_for_session_end().await;

    // Fatal errors leave the download in place for inspection.
    assert!(harness
        .download_dir()
        .read_dir()
        .unwrap()
        .next()
        .is_some());
}

#[tokio::test]
async fn test_delivery_retries_and_exhaustion_spare_siblings() {
    let harness = Harness::new(
        MockFetcher::completing().with_files(vec!["Movie/a.mkv", "Movie/b.mkv"]),
        MockEngine::new(),
        MockInspector::returning(hd_probe(1)),
    );

    harness.submit().await;
    harness.wait_for_prompt("Start this download?").await;
    harness.decide(Decision::Accept(true)).await;
    harness.wait_for_prompt("Create a short preview first?").await;
    harness.decide(Decision::Preview(true)).await;
    harness.wait_for_prompt("Upload the full version?").await;

    // Scripted after the preview went out, so only the full deliveries are
    // affected: a exhausts all three attempts, b fails twice then succeeds.
    harness.messenger.script_video_failures("a.mkv.mp4", 3).await;
    harness.messenger.script_video_failures("b.mkv.mp4", 2).await;

    harness.decide(Decision::Upload(true)).await;
    harness.wait_for_prompt("Remove the downloaded files?").await;

    // Exactly one exhaustion notification, for a only.
    let failure_texts: Vec<_> = harness
        .messenger
        .sent_texts()
        .await
        .into_iter()
        .filter(|(_, t)| t.contains("Failed to upload video file"))
        .collect();
    assert_eq!(failure_texts.len(), 1);
    assert!(failure_texts[0].1.contains("a.mkv.mp4"));

    // Despite a's exhaustion, b still landed.
    let delivered: Vec<_> = harness
        .messenger
        .sent_videos()
        .await
        .iter()
        .map(|v| v.filename.clone())
        .collect();
    assert!(delivered.contains(&"b.mkv.mp4".to_string()));
    // The only successful a.mkv.mp4 send is the earlier preview clip.
    assert_eq!(delivered.iter().filter(|f| *f == "a.mkv.mp4").count(), 1);
}

#[tokio::test]
async fn test_reject_at_acceptance_ends_session() {
    let harness = Harness::new(
        MockFetcher::completing(),
        MockEngine::new(),
        MockInspector::new(),
    );

    harness.submit().await;
    harness.wait_for_prompt("Start this download?").await;
    harness.decide(Decision::Accept(false)).await;

    harness.wait_for_text("Cancelled.").await;
    harness.wait_for_session_end().await;
}

#[tokio::test]
async fn test_sessions_are_independent_across_users() {
    let harness = Harness::new(
        MockFetcher::waiting_for_cancel(),
        MockEngine::new(),
        MockInspector::new(),
    );

    let descriptor_a = harness.work_root.path().join("a.torrent");
    let descriptor_b = harness.work_root.path().join("b.torrent");
    tokio::fs::write(&descriptor_a, b"x").await.unwrap();
    tokio::fs::write(&descriptor_b, b"x").await.unwrap();

    harness.pipeline.submit("100", "chat-100", descriptor_a).await.unwrap();
    harness.pipeline.submit("200", "chat-200", descriptor_b).await.unwrap();
    assert_eq!(harness.pipeline.active_sessions().await, 2);

    // Cancelling one user's acceptance leaves the other session alone.
    assert!(harness.pipeline.dispatch("100", Decision::Accept(false)).await);
    wait_until(|| async { harness.pipeline.active_sessions().await == 1 }).await;
    assert!(harness.pipeline.dispatch("200", Decision::Accept(true)).await);
}
