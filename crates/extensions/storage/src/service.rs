//! Background save service fed by the observer's transport.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use artifact_sync_protocols::{TransportError, TransportMessage, TurnTransport};

use crate::manager::StorageManager;

/// Observer-side end of the save channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<TransportMessage>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<TransportMessage>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl TurnTransport for ChannelTransport {
    async fn send(&self, message: TransportMessage) -> Result<(), TransportError> {
        self.tx.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                TransportError::Rejected("save queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                TransportError::ContextInvalidated("save service stopped".to_string())
            }
        })
    }
}

/// Counts reported when the service stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    pub failed: usize,
    pub media_skipped: usize,
}

/// Consumes [`TransportMessage`]s and persists each turn.
pub struct SaveService {
    manager: Arc<StorageManager>,
}

impl SaveService {
    pub fn new(manager: Arc<StorageManager>) -> Self {
        Self { manager }
    }

    /// Create the channel and spawn the service on it.
    pub fn spawn(self, capacity: usize) -> (ChannelTransport, JoinHandle<SaveReport>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = tokio::spawn(self.run(rx));
        (ChannelTransport::new(tx), handle)
    }

    /// Process messages until every sender is dropped.
    pub async fn run(self, mut rx: mpsc::Receiver<TransportMessage>) -> SaveReport {
        info!("Save service started. Sink: {}", self.manager.sink_name());
        let mut report = SaveReport::default();

        while let Some(message) = rx.recv().await {
            match message {
                TransportMessage::SaveTurn(payload) => {
                    debug!(prompt = %payload.safe_prompt_slug, "Received SAVE_TURN");
                    match self.manager.save_turn(&payload).await {
                        Ok(saved) => {
                            info!("Turn saved successfully: {}", saved.location);
                            report.saved += 1;
                            report.media_skipped += saved.media_skipped;
                        }
                        Err(e) => {
                            error!("Save failed: {}", e);
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        info!(
            saved = report.saved,
            failed = report.failed,
            "Save service stopped"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::DriveSink;
    use crate::folder::FolderSink;
    use artifact_sync_config::StorageMode;
    use artifact_sync_protocols::{ChatSource, TurnPayload};

    fn payload(prompt: &str) -> TurnPayload {
        TurnPayload {
            source: ChatSource::Gemini,
            title: "Cats".to_string(),
            prompt: prompt.to_string(),
            response: "ok".to_string(),
            timestamp: "2024-05-01T10-20-30-123Z".to_string(),
            safe_prompt_slug: prompt.to_string(),
            attachments: vec![],
            artifacts: vec![],
        }
    }

    #[tokio::test]
    async fn test_service_saves_until_closed() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StorageManager::with_sink(
            StorageMode::Folder,
            Arc::new(FolderSink::new(dir.path(), "Artifact Sync")),
        );
        let (transport, handle) = SaveService::new(Arc::new(manager)).spawn(8);

        transport
            .send(TransportMessage::SaveTurn(payload("one")))
            .await
            .unwrap();
        transport
            .send(TransportMessage::SaveTurn(payload("two")))
            .await
            .unwrap();
        drop(transport);

        let report = handle.await.unwrap();
        assert_eq!(report.saved, 2);
        assert_eq!(report.failed, 0);

        let base = dir.path().join("Artifact Sync").join("Gemini").join("Cats");
        assert!(base.join("one_2024-05-01T10-20-30-123Z.md").exists());
        assert!(base.join("two_2024-05-01T10-20-30-123Z.md").exists());
    }

    #[tokio::test]
    async fn test_service_counts_failures() {
        let manager = StorageManager::with_sink(StorageMode::Drive, Arc::new(DriveSink::new()));
        let (transport, handle) = SaveService::new(Arc::new(manager)).spawn(8);
        transport
            .send(TransportMessage::SaveTurn(payload("one")))
            .await
            .unwrap();
        drop(transport);

        let report = handle.await.unwrap();
        assert_eq!(report.saved, 0);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn test_send_after_service_stopped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let transport = ChannelTransport::new(tx);
        let err = transport
            .send(TransportMessage::SaveTurn(payload("one")))
            .await
            .unwrap_err();
        assert!(err.is_context_invalidated());
    }

    #[tokio::test]
    async fn test_send_when_queue_full() {
        let (tx, _rx) = mpsc::channel(1);
        let transport = ChannelTransport::new(tx);
        transport
            .send(TransportMessage::SaveTurn(payload("one")))
            .await
            .unwrap();
        let err = transport
            .send(TransportMessage::SaveTurn(payload("two")))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Rejected(_)));
    }
}
