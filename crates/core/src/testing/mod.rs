//! Controllable test doubles for the pipeline's collaborators.
//!
//! Each mock records the calls it receives and lets tests script outcomes
//! (completion, cancellation acknowledgment, injected failures) without any
//! real torrent, ffmpeg, or messaging traffic.

mod mock_engine;
mod mock_fetcher;
mod mock_inspector;
mod mock_messenger;

pub use mock_engine::MockEngine;
pub use mock_fetcher::MockFetcher;
pub use mock_inspector::MockInspector;
pub use mock_messenger::MockMessenger;
