//! Mock media inspector for testing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::inspector::{Inspector, MediaProbe};

/// Mock inspector returning canned probes.
pub struct MockInspector {
    default_probe: MediaProbe,
    overrides: Vec<(String, MediaProbe)>,
    calls: Arc<RwLock<Vec<PathBuf>>>,
}

impl MockInspector {
    /// Returns [`MediaProbe::degraded`] for every path.
    pub fn new() -> Self {
        Self::returning(MediaProbe::degraded())
    }

    /// Returns the given probe for every path without an override.
    pub fn returning(probe: MediaProbe) -> Self {
        Self {
            default_probe: probe,
            overrides: Vec::new(),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Returns `probe` for any path containing `path_substr`.
    ///
    /// Overrides are matched in registration order before the default.
    pub fn probe_for(mut self, path_substr: &str, probe: MediaProbe) -> Self {
        self.overrides.push((path_substr.to_string(), probe));
        self
    }

    /// Paths inspected, in call order.
    pub async fn recorded_calls(&self) -> Vec<PathBuf> {
        self.calls.read().await.clone()
    }
}

impl Default for MockInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Inspector for MockInspector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn inspect(&self, path: &Path) -> MediaProbe {
        self.calls.write().await.push(path.to_path_buf());
        let lossy = path.to_string_lossy();
        self.overrides
            .iter()
            .find(|(substr, _)| lossy.contains(substr))
            .map(|(_, probe)| probe.clone())
            .unwrap_or_else(|| self.default_probe.clone())
    }
}
