//! Emission boundary between the observer and the persistence side.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::payload::TurnPayload;

/// Messages sent from the observing context to the save service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportMessage {
    /// Persist a completed turn.
    SaveTurn(TurnPayload),
}

/// Fire-and-forget transport used by the observer.
///
/// Implementations must return promptly; delivery failures are reported as
/// [`TransportError`] and are never retried by the caller.
#[async_trait]
pub trait TurnTransport: Send + Sync {
    async fn send(&self, message: TransportMessage) -> Result<(), TransportError>;
}
