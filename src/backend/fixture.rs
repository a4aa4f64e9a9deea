// src/backend/fixture.rs

use async_trait::async_trait;
use std::path::PathBuf;

use super::{BackendError, GenerationBackend, Prompt};

/// Replays a canned model response from disk.
///
/// Used for offline runs and tests; the prompt is ignored.
pub struct FixtureBackend {
    path: PathBuf,
}

impl FixtureBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl GenerationBackend for FixtureBackend {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn complete(&self, _prompt: &Prompt) -> Result<String, BackendError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            BackendError::Unavailable(format!("cannot read fixture {:?}: {}", self.path, e))
        })
    }
}
