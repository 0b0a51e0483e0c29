//! Trait definitions for the transcode engine.

use async_trait::async_trait;

use super::error::EngineError;
use super::types::{EncodeSpec, TranscodeOutput};

/// An engine that performs one conversion per call.
#[async_trait]
pub trait TranscodeEngine: Send + Sync {
    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Runs one conversion to completion.
    ///
    /// Failures carry a bounded diagnostic excerpt of the engine output;
    /// see [`EngineError::diagnostic`].
    async fn transcode(&self, spec: EncodeSpec) -> Result<TranscodeOutput, EngineError>;

    /// Validates that the engine is properly configured and ready.
    async fn validate(&self) -> Result<(), EngineError>;
}
