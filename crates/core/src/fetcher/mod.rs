//! Download engine boundary.
//!
//! The pipeline treats the torrent-fetch engine as a black box: it starts a
//! fetch into a destination directory and the fetch either completes, fails,
//! or acknowledges a cancellation signal. Cancellation is cooperative; the
//! engine confirms it stopped by resolving with
//! [`FetchOutcome::Cancelled`].

mod librqbit;
mod types;

pub use librqbit::LibrqbitFetcher;
pub use types::{FetchError, FetchOutcome, Fetcher};
