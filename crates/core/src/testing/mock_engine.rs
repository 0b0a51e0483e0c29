//! Mock transcode engine for testing.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::converter::{EncodeSpec, EngineError, TranscodeEngine, TranscodeOutput};

#[derive(Clone)]
struct FailureSpec {
    /// Only inputs whose path contains this fail; `None` fails everything.
    input_substr: Option<String>,
    reason: String,
    stderr_tail: Option<String>,
}

/// Mock transcode engine that records specs and writes stub output files.
pub struct MockEngine {
    failure: Option<FailureSpec>,
    specs: Arc<RwLock<Vec<EncodeSpec>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            failure: None,
            specs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Fails every transcode with the given diagnostic.
    pub fn failing(reason: impl Into<String>, stderr_tail: Option<&str>) -> Self {
        Self {
            failure: Some(FailureSpec {
                input_substr: None,
                reason: reason.into(),
                stderr_tail: stderr_tail.map(String::from),
            }),
            specs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Fails only transcodes whose input path contains `substr`.
    pub fn failing_inputs_containing(substr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(FailureSpec {
                input_substr: Some(substr.into()),
                reason: reason.into(),
                stderr_tail: None,
            }),
            specs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Every spec received, in call order.
    pub async fn recorded_specs(&self) -> Vec<EncodeSpec> {
        self.specs.read().await.clone()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscodeEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transcode(&self, spec: EncodeSpec) -> Result<TranscodeOutput, EngineError> {
        self.specs.write().await.push(spec.clone());

        if let Some(failure) = &self.failure {
            let applies = match &failure.input_substr {
                Some(substr) => spec.input_path.to_string_lossy().contains(substr.as_str()),
                None => true,
            };
            if applies {
                return Err(EngineError::transcode_failed(
                    failure.reason.clone(),
                    failure.stderr_tail.clone(),
                ));
            }
        }

        if let Some(parent) = spec.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = b"mock encoded output";
        tokio::fs::write(&spec.output_path, content).await?;

        Ok(TranscodeOutput {
            output_path: spec.output_path.clone(),
            output_size_bytes: content.len() as u64,
            duration_ms: 1,
        })
    }

    async fn validate(&self) -> Result<(), EngineError> {
        Ok(())
    }
}
