//! Storage for Artifact Sync.
//!
//! Key-value state for the dedup guard, and the persistence side of the
//! transport: a save service that writes each received turn as a Markdown
//! log plus its media files.

mod drive;
mod error;
mod folder;
mod kv;
mod manager;
mod markdown;
mod media;
mod schema;
mod service;

pub use drive::DriveSink;
pub use error::StorageError;
pub use folder::{FolderSink, sanitize_title};
pub use kv::{MemoryKvStore, SqliteKvStore};
pub use manager::StorageManager;
pub use markdown::render_turn;
pub use service::{ChannelTransport, SaveReport, SaveService};

use async_trait::async_trait;

use artifact_sync_protocols::TurnPayload;

/// Where a turn ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTurn {
    /// Path (or remote identifier) of the Markdown log.
    pub location: String,
    pub media_saved: usize,
    pub media_skipped: usize,
}

/// A destination for completed turns.
#[async_trait]
pub trait TurnSink: Send + Sync {
    fn name(&self) -> &str;

    async fn save(&self, payload: &TurnPayload) -> Result<SavedTurn, StorageError>;
}
