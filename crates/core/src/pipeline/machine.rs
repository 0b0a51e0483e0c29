//! Session pipeline manager and per-session actor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::converter::{AudioSelection, TranscodeEngine};
use crate::delivery::DeliverySupervisor;
use crate::descriptor::summarize_descriptor;
use crate::fetcher::{FetchOutcome, Fetcher};
use crate::gateway::{Choice, Decision, Messenger, VideoDelivery};
use crate::inspector::Inspector;
use crate::planner::{self, EncodeIntent, PlanInput};

use super::session::{resolve_asset_dir, video_files, Session};
use super::types::{PipelineError, SessionEvent, Stage, TerminalState};

/// Per-session event queue depth. Events are rare (button presses, one
/// download completion), so a small buffer suffices.
const EVENT_QUEUE_DEPTH: usize = 16;

/// Drives every user session through the pipeline.
///
/// One actor task per session processes its events strictly one at a time;
/// sessions for different users are fully independent. The manager only
/// routes inbound events to the right actor.
pub struct SessionPipeline {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    engine: Arc<dyn TranscodeEngine>,
    inspector: Arc<dyn Inspector>,
    messenger: Arc<dyn Messenger>,
    supervisor: DeliverySupervisor,
    sessions: Arc<RwLock<HashMap<String, mpsc::Sender<SessionEvent>>>>,
}

impl SessionPipeline {
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn Fetcher>,
        engine: Arc<dyn TranscodeEngine>,
        inspector: Arc<dyn Inspector>,
        messenger: Arc<dyn Messenger>,
    ) -> Self {
        Self {
            config,
            fetcher,
            engine,
            inspector,
            messenger,
            supervisor: DeliverySupervisor::default(),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Handles a descriptor submission.
    ///
    /// Rejections (unauthorized user, wrong file type, session already in
    /// flight) are reported to the user and no session is created. On
    /// success a session actor is spawned and the confirmation prompt sent.
    pub async fn submit(
        &self,
        user_id: &str,
        chat_id: &str,
        descriptor_path: PathBuf,
    ) -> Result<(), PipelineError> {
        if !self.config.is_authorized(user_id) {
            warn!(user_id, "Rejected submission from unauthorized user");
            self.send_text(chat_id, "You are not authorized to use this service.")
                .await;
            return Err(PipelineError::Unauthorized {
                user_id: user_id.to_string(),
            });
        }

        let is_torrent = descriptor_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("torrent"))
            .unwrap_or(false);
        if !is_torrent {
            self.send_text(chat_id, "Please send a .torrent file.").await;
            return Err(PipelineError::InvalidSubmission(format!(
                "not a .torrent file: {}",
                descriptor_path.display()
            )));
        }

        let summary = summarize_descriptor(&descriptor_path).await;
        let session = Session::new(
            user_id.to_string(),
            chat_id.to_string(),
            &self.config.work_root,
            descriptor_path,
            summary,
        );

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);

        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(user_id) {
                drop(sessions);
                self.send_text(
                    chat_id,
                    "A job is already in progress. Finish or cancel it first.",
                )
                .await;
                return Err(PipelineError::SessionInProgress {
                    user_id: user_id.to_string(),
                });
            }
            sessions.insert(user_id.to_string(), events_tx.clone());
        }

        info!(user_id, session_id = %session.id, "Session created");

        let prompt_text = format!(
            "{}\n\nStart this download?",
            session.summary.render_prompt(&session.descriptor_name())
        );
        if let Err(e) = self
            .messenger
            .prompt(
                chat_id,
                &prompt_text,
                &Choice::yes_no("Yes", "No", Decision::Accept),
            )
            .await
        {
            warn!(user_id, error = %e, "Failed to send confirmation prompt");
        }

        let actor = SessionActor {
            session,
            config: Arc::clone(&self.config),
            fetcher: Arc::clone(&self.fetcher),
            engine: Arc::clone(&self.engine),
            inspector: Arc::clone(&self.inspector),
            messenger: Arc::clone(&self.messenger),
            supervisor: self.supervisor,
            self_tx: events_tx,
        };
        let sessions = Arc::clone(&self.sessions);
        let user_key = user_id.to_string();
        tokio::spawn(async move {
            actor.run(events_rx).await;
            sessions.write().await.remove(&user_key);
        });

        Ok(())
    }

    /// Routes a button-press decision to the user's session, if any.
    ///
    /// Returns whether a session received the event.
    pub async fn dispatch(&self, user_id: &str, decision: Decision) -> bool {
        let sender = {
            let sessions = self.sessions.read().await;
            sessions.get(user_id).cloned()
        };
        match sender {
            Some(tx) => tx.send(SessionEvent::Decision(decision)).await.is_ok(),
            None => {
                debug!(user_id, "Decision with no active session ignored");
                false
            }
        }
    }

    /// Handles a cancellation command.
    ///
    /// Routed into the session when one exists; otherwise answered with a
    /// plain dismissal.
    pub async fn request_cancel(&self, user_id: &str, chat_id: &str) {
        let sender = {
            let sessions = self.sessions.read().await;
            sessions.get(user_id).cloned()
        };
        match sender {
            Some(tx) => {
                let _ = tx.send(SessionEvent::CancelRequested).await;
            }
            None => {
                self.send_text(chat_id, "Nothing to cancel.").await;
            }
        }
    }

    /// Number of sessions currently in flight.
    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn send_text(&self, chat_id: &str, text: &str) {
        if let Err(e) = self.messenger.send_text(chat_id, text).await {
            warn!(chat_id, error = %e, "Failed to send message");
        }
    }
}

/// Owns one session and processes its events sequentially.
struct SessionActor {
    session: Session,
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    engine: Arc<dyn TranscodeEngine>,
    inspector: Arc<dyn Inspector>,
    messenger: Arc<dyn Messenger>,
    supervisor: DeliverySupervisor,
    self_tx: mpsc::Sender<SessionEvent>,
}

impl SessionActor {
    async fn run(mut self, mut events: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
            if self.session.stage.is_terminal() {
                break;
            }
        }
        let elapsed_secs = (chrono::Utc::now() - self.session.created_at).num_seconds();
        info!(
            session_id = %self.session.id,
            user_id = %self.session.user_id,
            stage = ?self.session.stage,
            elapsed_secs,
            "Session finished"
        );
    }

    async fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::CancelRequested => self.on_cancel_requested().await,
            SessionEvent::DownloadFinished(result) => {
                if self.session.stage == Stage::Downloading {
                    self.on_download_finished(result).await;
                } else {
                    debug!(stage = ?self.session.stage, "Stale download completion ignored");
                }
            }
            SessionEvent::Decision(decision) => self.on_decision(decision).await,
        }
    }

    async fn on_decision(&mut self, decision: Decision) {
        match (self.session.stage, decision) {
            (Stage::AwaitingAcceptance, Decision::Accept(true)) => {
                self.messenger.clear_prompt(&self.session.chat_id).await;
                self.start_download().await;
            }
            (Stage::AwaitingAcceptance, Decision::Accept(false)) => {
                self.messenger.clear_prompt(&self.session.chat_id).await;
                self.notify("Cancelled.").await;
                self.session.stage = Stage::Terminal(TerminalState::Cancelled);
            }
            (Stage::AwaitingAudioSelection, Decision::AudioTrack(index)) => {
                let track_count = self
                    .session
                    .probe
                    .as_ref()
                    .map(|p| p.audio_tracks.len())
                    .unwrap_or(0);
                if index >= track_count {
                    warn!(index, track_count, "Audio selection out of range ignored");
                    return;
                }
                self.session.selected_audio = Some(index);
                self.messenger.clear_prompt(&self.session.chat_id).await;
                self.prompt_preview().await;
            }
            (Stage::AwaitingPreviewDecision, Decision::Preview(true)) => {
                self.messenger.clear_prompt(&self.session.chat_id).await;
                self.run_preview().await;
            }
            (Stage::AwaitingPreviewDecision, Decision::Preview(false)) => {
                self.messenger.clear_prompt(&self.session.chat_id).await;
                self.prompt_cleanup().await;
            }
            (Stage::AwaitingUploadDecision, Decision::Upload(true)) => {
                self.messenger.clear_prompt(&self.session.chat_id).await;
                self.convert_and_deliver().await;
            }
            (Stage::AwaitingUploadDecision, Decision::Upload(false)) => {
                self.messenger.clear_prompt(&self.session.chat_id).await;
                self.prompt_cleanup().await;
            }
            (Stage::AwaitingCleanupDecision, Decision::Cleanup(true)) => {
                self.messenger.clear_prompt(&self.session.chat_id).await;
                remove_dir_best_effort(&self.session.paths.download_dir);
                self.notify("Downloaded files removed.").await;
                self.session.stage = Stage::Terminal(TerminalState::Completed);
            }
            (Stage::AwaitingCleanupDecision, Decision::Cleanup(false)) => {
                self.messenger.clear_prompt(&self.session.chat_id).await;
                self.notify("Downloaded files kept.").await;
                self.session.stage = Stage::Terminal(TerminalState::Cancelled);
            }
            (stage, decision) => {
                debug!(?stage, ?decision, "Decision out of stage ignored");
            }
        }
    }

    /// Cancellation only has an effect while a download is active; the
    /// engine acknowledges by resolving the download task, and state
    /// advances there, not here.
    async fn on_cancel_requested(&mut self) {
        match self.session.download_cancel.take() {
            Some(cancel_tx) => {
                self.session.cancel_requested = true;
                let _ = cancel_tx.send(());
                info!(session_id = %self.session.id, "Cancellation signalled to download");
                self.notify("Cancelling download…").await;
            }
            None => {
                self.notify("Nothing to cancel right now.").await;
            }
        }
    }

    async fn start_download(&mut self) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.session.download_cancel = Some(cancel_tx);
        self.session.stage = Stage::Downloading;

        info!(
            session_id = %self.session.id,
            dest = %self.session.paths.download_dir.display(),
            "Starting download"
        );
        self.notify("Download started.").await;

        let fetcher = Arc::clone(&self.fetcher);
        let descriptor = self.session.paths.descriptor_path.clone();
        let dest = self.session.paths.download_dir.clone();
        let self_tx = self.self_tx.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch(&descriptor, &dest, cancel_rx).await;
            let _ = self_tx.send(SessionEvent::DownloadFinished(result)).await;
        });
    }

    async fn on_download_finished(
        &mut self,
        result: Result<FetchOutcome, crate::fetcher::FetchError>,
    ) {
        self.session.download_cancel = None;

        match result {
            // The cancel flag is checked here, at the single completion
            // point, so a download that finished in the race still lands
            // on the cleanup prompt instead of stale follow-up prompts.
            Ok(FetchOutcome::Cancelled) => {
                self.notify("Download cancelled.").await;
                self.prompt_cleanup().await;
            }
            Ok(FetchOutcome::Completed) if self.session.cancel_requested => {
                self.notify("Download cancelled.").await;
                self.prompt_cleanup().await;
            }
            Ok(FetchOutcome::Completed) => self.on_download_completed().await,
            Err(e) => {
                self.fail(&format!("Download failed: {}", e)).await;
            }
        }
    }

    async fn on_download_completed(&mut self) {
        let media_dir = match resolve_asset_dir(&self.session.paths.download_dir) {
            Ok(dir) => dir,
            Err(PipelineError::AmbiguousLayout { count }) => {
                self.fail(&format!(
                    "The download contains {} directories; cannot determine which holds the media.",
                    count
                ))
                .await;
                return;
            }
            Err(e) => {
                self.fail(&format!("Failed to read the download directory: {}", e))
                    .await;
                return;
            }
        };

        let files = match video_files(&media_dir) {
            Ok(files) => files,
            Err(e) => {
                self.fail(&format!("Failed to read the download directory: {}", e))
                    .await;
                return;
            }
        };
        if files.is_empty() {
            self.fail("No video files were found in the download.").await;
            return;
        }

        info!(
            session_id = %self.session.id,
            media_dir = %media_dir.display(),
            video_count = files.len(),
            "Download completed"
        );

        let sample_name = file_name_of(&files[0]);
        let probe = self.inspector.inspect(&files[0]).await;
        let choices: Vec<Choice> = probe
            .audio_tracks
            .iter()
            .map(|t| Choice::new(t.label.clone(), Decision::AudioTrack(t.index)))
            .collect();
        let prompt_text = format!(
            "{}\n{}\nSelect an audio track:",
            sample_name, probe.title
        );
        self.session.media_dir = Some(media_dir);
        self.session.probe = Some(probe);

        if choices.len() >= 2 {
            if let Err(e) = self
                .messenger
                .prompt(&self.session.chat_id, &prompt_text, &choices)
                .await
            {
                warn!(error = %e, "Failed to send audio selection prompt");
            }
            self.session.stage = Stage::AwaitingAudioSelection;
        } else {
            self.prompt_preview().await;
        }
    }

    async fn prompt_preview(&mut self) {
        if let Err(e) = self
            .messenger
            .prompt(
                &self.session.chat_id,
                "Create a short preview first?",
                &Choice::yes_no("Yes", "No", Decision::Preview),
            )
            .await
        {
            warn!(error = %e, "Failed to send preview prompt");
        }
        self.session.stage = Stage::AwaitingPreviewDecision;
    }

    async fn run_preview(&mut self) {
        self.session.stage = Stage::PreviewProcessing;

        let input = match self.first_video_file() {
            Some(path) => path,
            None => {
                self.fail("No video files were found in the download.").await;
                return;
            }
        };
        let input_name = file_name_of(&input);
        let size_bytes = match tokio::fs::metadata(&input).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                self.fail(&format!("Failed to read {}: {}", input_name, e)).await;
                return;
            }
        };

        let probe = self.session.probe.clone().unwrap_or_default();
        let output_path = self
            .session
            .paths
            .preview_dir
            .join(format!("{}.mp4", input_name));
        let spec = planner::plan(
            &input,
            &output_path,
            PlanInput {
                size_bytes,
                duration_secs: probe.duration_secs,
            },
            EncodeIntent::Preview,
            self.audio_selection(),
        );

        self.notify("Creating preview…").await;

        let scaled = spec.scale.is_some();
        let start_secs = spec.start_secs.unwrap_or(0.0);
        let cap_secs = spec.max_duration_secs.unwrap_or(0) as f64;

        let output = match self.engine.transcode(spec).await {
            Ok(output) => output,
            Err(e) => {
                self.fail(&format!("Preview conversion failed: {}", e.diagnostic()))
                    .await;
                return;
            }
        };

        let (width, height) = match (probe.width, probe.height) {
            (Some(w), Some(h)) if scaled => {
                let (sw, sh) = planner::scaled_dimensions(w, h);
                (Some(sw), Some(sh))
            }
            dims => dims,
        };
        let mut caption = format!("Sample of {}", input_name);
        if let (Some(w), Some(h)) = (probe.width, probe.height) {
            caption.push_str(&format!("\nOriginal: {}x{}", w, h));
            if let (Some(sw), Some(sh)) = (width, height) {
                caption.push_str(&format!("\nConverted: {}x{}", sw, sh));
            }
        }
        let duration_secs = probe
            .duration_secs
            .filter(|d| *d > 0.0)
            .map(|d| (d - start_secs).min(cap_secs));

        let delivery = VideoDelivery {
            chat_id: self.session.chat_id.clone(),
            path: output.output_path.clone(),
            filename: file_name_of(&output.output_path),
            caption,
            width,
            height,
            duration_secs,
        };
        if let Err(e) = self.messenger.send_video(&delivery).await {
            warn!(error = %e, "Failed to send preview");
            self.notify("Failed to send the preview.").await;
        }

        remove_dir_best_effort(&self.session.paths.preview_dir);

        if let Err(e) = self
            .messenger
            .prompt(
                &self.session.chat_id,
                "Upload the full version?",
                &Choice::yes_no("Yes", "No", Decision::Upload),
            )
            .await
        {
            warn!(error = %e, "Failed to send upload prompt");
        }
        self.session.stage = Stage::AwaitingUploadDecision;
    }

    async fn convert_and_deliver(&mut self) {
        self.session.stage = Stage::Converting;

        let media_dir = match &self.session.media_dir {
            Some(dir) => dir.clone(),
            None => {
                self.fail("No media directory resolved.").await;
                return;
            }
        };
        let files = match video_files(&media_dir) {
            Ok(files) if !files.is_empty() => files,
            Ok(_) => {
                self.fail("No video files were found in the download.").await;
                return;
            }
            Err(e) => {
                self.fail(&format!("Failed to read the media directory: {}", e))
                    .await;
                return;
            }
        };

        self.notify(&format!(
            "Converting {} video{}…",
            files.len(),
            plural(files.len())
        ))
        .await;

        let probe = self.session.probe.clone().unwrap_or_default();
        let audio = self.audio_selection();
        let mut outputs = Vec::with_capacity(files.len());

        // Sequential on purpose: one encode at a time bounds resource use,
        // and any failure aborts the remaining files.
        for input in &files {
            let input_name = file_name_of(input);
            let size_bytes = match tokio::fs::metadata(input).await {
                Ok(meta) => meta.len(),
                Err(e) => {
                    self.fail(&format!("Failed to read {}: {}", input_name, e)).await;
                    return;
                }
            };
            let output_path = self
                .session
                .paths
                .delivery_dir
                .join(format!("{}.mp4", input_name));
            let spec = planner::plan(
                input,
                &output_path,
                PlanInput {
                    size_bytes,
                    duration_secs: probe.duration_secs,
                },
                EncodeIntent::Full,
                audio,
            );
            let scaled = spec.scale.is_some();

            match self.engine.transcode(spec).await {
                Ok(output) => {
                    info!(
                        session_id = %self.session.id,
                        input = %input_name,
                        output_bytes = output.output_size_bytes,
                        "Conversion finished"
                    );
                    self.notify(&format!("Successfully converted: {}", input_name))
                        .await;
                    outputs.push((output.output_path, scaled));
                }
                Err(e) => {
                    self.fail(&format!(
                        "Conversion failed for {}: {}",
                        input_name,
                        e.diagnostic()
                    ))
                    .await;
                    return;
                }
            }
        }

        self.deliver(outputs, &probe).await;
    }

    async fn deliver(&mut self, outputs: Vec<(PathBuf, bool)>, probe: &crate::inspector::MediaProbe) {
        self.session.stage = Stage::Delivering;

        let target_chat = self
            .config
            .delivery_chat_id
            .clone()
            .unwrap_or_else(|| self.session.chat_id.clone());

        self.notify(&format!(
            "Uploading {} video{}…",
            outputs.len(),
            plural(outputs.len())
        ))
        .await;

        for (path, scaled) in &outputs {
            let filename = file_name_of(path);
            // Each converted file is probed for its own metadata; the probe
            // of the original first file only serves as a fallback when the
            // output probe comes back degraded.
            let output_probe = self.inspector.inspect(path).await;
            let (width, height) = match (output_probe.width, output_probe.height) {
                (Some(w), Some(h)) => (Some(w), Some(h)),
                _ => match (probe.width, probe.height) {
                    (Some(w), Some(h)) if *scaled => {
                        let (sw, sh) = planner::scaled_dimensions(w, h);
                        (Some(sw), Some(sh))
                    }
                    dims => dims,
                },
            };
            let delivery = VideoDelivery {
                chat_id: target_chat.clone(),
                path: path.clone(),
                filename: filename.clone(),
                caption: filename.clone(),
                width,
                height,
                duration_secs: output_probe.duration_secs.or(probe.duration_secs),
            };

            let messenger = Arc::clone(&self.messenger);
            let notify_messenger = Arc::clone(&self.messenger);
            let notify_chat = self.session.chat_id.clone();
            let notify_text = format!("Failed to upload video file: {}", filename);

            // One item's exhaustion never aborts the siblings.
            let _ = self
                .supervisor
                .run(
                    &filename,
                    || {
                        let messenger = Arc::clone(&messenger);
                        let delivery = delivery.clone();
                        async move { messenger.send_video(&delivery).await }
                    },
                    move || async move { notify_messenger.send_text(&notify_chat, &notify_text).await },
                )
                .await;
        }

        remove_dir_best_effort(&self.session.paths.delivery_dir);
        self.prompt_cleanup().await;
    }

    async fn prompt_cleanup(&mut self) {
        if let Err(e) = self
            .messenger
            .prompt(
                &self.session.chat_id,
                "Remove the downloaded files?",
                &Choice::yes_no("Yes", "No", Decision::Cleanup),
            )
            .await
        {
            warn!(error = %e, "Failed to send cleanup prompt");
        }
        self.session.stage = Stage::AwaitingCleanupDecision;
    }

    /// Fatal errors terminate the session and leave the working
    /// directories in place for inspection.
    async fn fail(&mut self, message: &str) {
        warn!(
            session_id = %self.session.id,
            user_id = %self.session.user_id,
            message,
            "Session failed"
        );
        self.notify(message).await;
        self.session.stage = Stage::Terminal(TerminalState::Failed);
    }

    async fn notify(&self, text: &str) {
        if let Err(e) = self.messenger.send_text(&self.session.chat_id, text).await {
            warn!(chat_id = %self.session.chat_id, error = %e, "Failed to send message");
        }
    }

    fn audio_selection(&self) -> AudioSelection {
        match self.session.selected_audio {
            Some(index) => AudioSelection::Track(index),
            None => AudioSelection::Default,
        }
    }

    fn first_video_file(&self) -> Option<PathBuf> {
        let media_dir = self.session.media_dir.as_ref()?;
        video_files(media_dir).ok()?.into_iter().next()
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn remove_dir_best_effort(path: &Path) {
    if let Err(e) = std::fs::remove_dir_all(path) {
        debug!(path = %path.display(), error = %e, "Directory removal skipped");
    }
}
