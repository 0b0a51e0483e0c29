//! Messaging gateway boundary.
//!
//! The pipeline talks to its user through this module: inbound button-press
//! decisions arrive as [`Decision`] values and outbound prompts, texts and
//! media go through the [`Messenger`] trait. The concrete transport (which
//! chat service, which API client) lives outside this crate.

mod traits;
mod types;

pub use traits::Messenger;
pub use types::{Choice, Decision, MessengerError, VideoDelivery};
