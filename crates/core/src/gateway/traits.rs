//! Trait definitions for the messaging gateway.

use async_trait::async_trait;

use super::types::{Choice, MessengerError, VideoDelivery};

/// Outbound side of the messaging gateway.
///
/// Implementations are transport-specific (chat bot API, test double).
/// All methods address one recipient chat at a time; the pipeline never
/// broadcasts.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Returns the name of this messenger implementation.
    fn name(&self) -> &str;

    /// Sends a plain text message.
    async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), MessengerError>;

    /// Sends a prompt with an inline choice keyboard.
    ///
    /// Each choice renders as one button; pressing it routes the decision
    /// back into the pipeline.
    async fn prompt(
        &self,
        chat_id: &str,
        text: &str,
        choices: &[Choice],
    ) -> Result<(), MessengerError>;

    /// Delivers a video file.
    async fn send_video(&self, video: &VideoDelivery) -> Result<(), MessengerError>;

    /// Removes any pending inline keyboard, best-effort.
    ///
    /// Failure here is not meaningful; implementations may no-op.
    async fn clear_prompt(&self, chat_id: &str);
}
