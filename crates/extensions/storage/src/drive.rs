//! Cloud drive destination.

use async_trait::async_trait;
use tracing::warn;

use artifact_sync_protocols::TurnPayload;

use crate::error::StorageError;
use crate::{SavedTurn, TurnSink};

/// Drive sink. No OAuth client is wired in, so every save fails.
#[derive(Debug, Default)]
pub struct DriveSink {
    client_id: Option<String>,
}

impl DriveSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_configured(&self) -> bool {
        self.client_id.is_some()
    }
}

#[async_trait]
impl TurnSink for DriveSink {
    fn name(&self) -> &str {
        "drive"
    }

    async fn save(&self, payload: &TurnPayload) -> Result<SavedTurn, StorageError> {
        warn!("Drive storage requested for turn {}", payload.safe_prompt_slug);
        Err(StorageError::NotConfigured(
            "drive support requires an OAuth client id".to_string(),
        ))
    }
}
