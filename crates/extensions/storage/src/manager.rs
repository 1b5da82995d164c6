//! Routes turns to the configured destination.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use artifact_sync_config::{StorageMode, StorageSection};
use artifact_sync_protocols::TurnPayload;

use crate::drive::DriveSink;
use crate::error::StorageError;
use crate::folder::FolderSink;
use crate::{SavedTurn, TurnSink};

/// Picks the sink for the configured [`StorageMode`].
pub struct StorageManager {
    mode: StorageMode,
    sink: Arc<dyn TurnSink>,
}

impl StorageManager {
    /// Build the manager from the storage section.
    ///
    /// `folder` must already be tilde-expanded.
    pub fn from_config(section: &StorageSection) -> Result<Self, StorageError> {
        let sink: Arc<dyn TurnSink> = match section.mode {
            StorageMode::Local => Arc::new(FolderSink::downloads(&section.root_folder_name)?),
            StorageMode::Folder => {
                let folder = section.folder.as_deref().ok_or_else(|| {
                    StorageError::NotConfigured("storage.folder is not set".to_string())
                })?;
                Arc::new(FolderSink::new(
                    PathBuf::from(folder),
                    section.root_folder_name.clone(),
                ))
            }
            StorageMode::Drive => Arc::new(DriveSink::new()),
        };
        info!("Storage manager ready. Mode: {}", section.mode);
        Ok(Self {
            mode: section.mode,
            sink,
        })
    }

    pub fn with_sink(mode: StorageMode, sink: Arc<dyn TurnSink>) -> Self {
        Self { mode, sink }
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    pub async fn save_turn(&self, payload: &TurnPayload) -> Result<SavedTurn, StorageError> {
        self.sink.save(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_mode_requires_folder() {
        let section = StorageSection {
            mode: StorageMode::Folder,
            ..Default::default()
        };
        assert!(matches!(
            StorageManager::from_config(&section),
            Err(StorageError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_folder_mode() {
        let dir = tempfile::tempdir().unwrap();
        let section = StorageSection {
            mode: StorageMode::Folder,
            folder: Some(dir.path().display().to_string()),
            ..Default::default()
        };
        let manager = StorageManager::from_config(&section).unwrap();
        assert_eq!(manager.mode(), StorageMode::Folder);
        assert_eq!(manager.sink_name(), "folder");
    }

    #[test]
    fn test_drive_mode() {
        let section = StorageSection {
            mode: StorageMode::Drive,
            ..Default::default()
        };
        let manager = StorageManager::from_config(&section).unwrap();
        assert_eq!(manager.sink_name(), "drive");
    }
}
