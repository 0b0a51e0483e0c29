//! Trait definitions for the media inspector.

use async_trait::async_trait;
use std::path::Path;

use super::types::MediaProbe;

/// Inspects media files.
///
/// Inspection is infallible by contract: implementations degrade to
/// [`MediaProbe::degraded`] instead of erroring, so a broken or missing
/// file never fails the pipeline by itself.
#[async_trait]
pub trait Inspector: Send + Sync {
    /// Returns the name of this inspector implementation.
    fn name(&self) -> &str;

    /// Probes a media file.
    async fn inspect(&self, path: &Path) -> MediaProbe;
}
