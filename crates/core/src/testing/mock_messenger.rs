//! Mock messaging gateway for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::gateway::{Choice, Messenger, MessengerError, VideoDelivery};

#[derive(Default)]
struct Recorded {
    texts: Vec<(String, String)>,
    prompts: Vec<(String, String, Vec<Choice>)>,
    videos: Vec<VideoDelivery>,
    cleared_prompts: usize,
    /// (filename substring, remaining send_video failures)
    video_failures: Vec<(String, u32)>,
}

/// Mock messaging gateway recording all outbound traffic.
///
/// Delivery failures can be scripted per filename to exercise the retry
/// supervisor.
pub struct MockMessenger {
    state: Arc<RwLock<Recorded>>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(Recorded::default())),
        }
    }

    /// Makes the next `count` `send_video` calls whose filename contains
    /// `filename_substr` fail.
    pub async fn script_video_failures(&self, filename_substr: &str, count: u32) {
        self.state
            .write()
            .await
            .video_failures
            .push((filename_substr.to_string(), count));
    }

    /// All `(chat_id, text)` pairs sent, in order.
    pub async fn sent_texts(&self) -> Vec<(String, String)> {
        self.state.read().await.texts.clone()
    }

    /// All `(chat_id, text, choices)` prompts sent, in order.
    pub async fn sent_prompts(&self) -> Vec<(String, String, Vec<Choice>)> {
        self.state.read().await.prompts.clone()
    }

    /// All successfully delivered videos, in order.
    pub async fn sent_videos(&self) -> Vec<VideoDelivery> {
        self.state.read().await.videos.clone()
    }

    /// Number of `clear_prompt` calls received.
    pub async fn cleared_prompts(&self) -> usize {
        self.state.read().await.cleared_prompts
    }

    /// The most recent prompt, for asserting on the current question.
    pub async fn last_prompt(&self) -> Option<(String, String, Vec<Choice>)> {
        self.state.read().await.prompts.last().cloned()
    }
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), MessengerError> {
        self.state
            .write()
            .await
            .texts
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn prompt(
        &self,
        chat_id: &str,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), MessengerError> {
        self.state.write().await.prompts.push((
            chat_id.to_string(),
            text.to_string(),
            choices.to_vec(),
        ));
        Ok(())
    }

    async fn send_video(&self, video: &VideoDelivery) -> Result<(), MessengerError> {
        let mut state = self.state.write().await;
        for (substr, remaining) in state.video_failures.iter_mut() {
            if *remaining > 0 && video.filename.contains(substr.as_str()) {
                *remaining -= 1;
                return Err(MessengerError::SendFailed(format!(
                    "scripted failure for {}",
                    video.filename
                )));
            }
        }
        state.videos.push(video.clone());
        Ok(())
    }

    async fn clear_prompt(&self, _chat_id: &str) {
        self.state.write().await.cleared_prompts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn video(filename: &str) -> VideoDelivery {
        VideoDelivery {
            chat_id: "c1".to_string(),
            path: PathBuf::from(format!("/out/{}", filename)),
            filename: filename.to_string(),
            caption: filename.to_string(),
            width: None,
            height: None,
            duration_secs: None,
        }
    }

    #[tokio::test]
    async fn test_records_traffic() {
        let messenger = MockMessenger::new();
        messenger.send_text("c1", "hello").await.unwrap();
        messenger.send_video(&video("a.mp4")).await.unwrap();
        messenger.clear_prompt("c1").await;

        assert_eq!(messenger.sent_texts().await, vec![("c1".into(), "hello".into())]);
        assert_eq!(messenger.sent_videos().await.len(), 1);
        assert_eq!(messenger.cleared_prompts().await, 1);
    }

    #[tokio::test]
    async fn test_scripted_video_failures_consume() {
        let messenger = MockMessenger::new();
        messenger.script_video_failures("a.mp4", 2).await;

        assert!(messenger.send_video(&video("a.mp4")).await.is_err());
        assert!(messenger.send_video(&video("b.mp4")).await.is_ok());
        assert!(messenger.send_video(&video("a.mp4")).await.is_err());
        assert!(messenger.send_video(&video("a.mp4")).await.is_ok());

        assert_eq!(messenger.sent_videos().await.len(), 2);
    }
}
