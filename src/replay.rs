//! Replays a recorded page trace through a live observer.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use artifact_sync_dom::{Document, DomError, DomOp, DomScript, SharedDocument};
use artifact_sync_observer::{
    CancellationToken, ObserverConfig, ObserverError, ObserverStats, Probe, TurnObserver,
};
use artifact_sync_protocols::KeyValueStore;
use artifact_sync_storage::{SaveReport, SaveService, StorageManager};

/// Queue size between the observer and the save service.
const SAVE_QUEUE: usize = 16;

#[derive(Debug, Error)]
pub(crate) enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid trace: {0}")]
    Trace(#[from] serde_json::Error),

    #[error("Step {index} failed: {source}")]
    Step { index: usize, source: DomError },

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Observer error: {0}")]
    Observer(#[from] ObserverError),

    #[error("Task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A recorded page session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Trace {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub steps: Vec<TraceStep>,
}

/// One op, applied `at_ms` after the replay starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct TraceStep {
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub op: DomOp,
}

impl Trace {
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReplaySummary {
    pub steps: usize,
    pub observer: ObserverStats,
    pub saves: SaveReport,
}

/// Everything needed to run one replay.
pub(crate) struct Replayer {
    pub config: ObserverConfig,
    pub probe: Probe,
    pub store: Arc<dyn KeyValueStore>,
    pub storage: Arc<StorageManager>,
}

impl Replayer {
    pub async fn run(self, trace: Trace, settle: Duration) -> Result<ReplaySummary, ReplayError> {
        info!(
            "Replaying {} steps on {} ({})",
            trace.steps.len(),
            trace.url,
            self.probe.profile().source()
        );

        let mut doc = Document::new(trace.url.clone(), trace.title.clone());
        let body = doc.body();
        let main = doc.create_element("main");
        doc.append_child(body, main)?;
        let doc = doc.into_shared();

        let (transport, service) = SaveService::new(self.storage).spawn(SAVE_QUEUE);
        let (observer, mutations) = TurnObserver::attach(
            doc.clone(),
            self.probe,
            self.config,
            self.store,
            Arc::new(transport),
        )
        .await?;

        let shutdown = CancellationToken::new();
        let observer = tokio::spawn(observer.run(mutations, shutdown.clone()));

        let applied = apply_steps(&doc, &trace.steps).await;
        if applied.is_ok() {
            tokio::time::sleep(settle).await;
        }
        shutdown.cancel();
        // The observer owns the last transport handle; the service stops
        // once it is gone.
        let stats = observer.await?;
        let saves = service.await?;
        applied?;

        info!(
            turns = stats.turns_started,
            emitted = stats.emitted,
            saved = saves.saved,
            "Replay finished"
        );

        Ok(ReplaySummary {
            steps: trace.steps.len(),
            observer: stats,
            saves,
        })
    }
}

/// Apply each step at its offset from now, flushing mutations after each.
async fn apply_steps(doc: &SharedDocument, steps: &[TraceStep]) -> Result<(), ReplayError> {
    let start = tokio::time::Instant::now();
    let mut script = DomScript::new();
    for (index, step) in steps.iter().enumerate() {
        tokio::time::sleep_until(start + Duration::from_millis(step.at_ms)).await;
        let mut doc = doc.write();
        script
            .apply(&mut doc, &step.op)
            .map_err(|source| ReplayError::Step { index, source })?;
        let records = doc.flush_mutations();
        debug!(index, records, "Step applied");
    }
    Ok(())
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
