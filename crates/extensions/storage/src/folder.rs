//! Writes turns into a directory tree.
//!
//! Layout: `{root}/{root_folder_name}/{source}/{title}/`, holding
//! `{slug}_{timestamp}.md` plus `attachments/` and `artifacts/`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use artifact_sync_protocols::{MediaEntry, TurnPayload};

use crate::error::StorageError;
use crate::markdown::{ARTIFACTS_DIR, ATTACHMENTS_DIR, render_turn};
use crate::media::{MediaFetcher, truncate};
use crate::{SavedTurn, TurnSink};

/// Replace path separators and `:` in a conversation title.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .trim()
        .chars()
        .map(|c| if matches!(c, ':' | '/' | '\\') { '-' } else { c })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "Conversation".to_string()
    } else {
        cleaned
    }
}

/// First free path for `name` in `dir`: `name`, then `stem (1).ext`, `stem (2).ext`, ...
async fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !fs::try_exists(&candidate).await.unwrap_or(false) {
        return candidate;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let mut n = 1;
    loop {
        let name = match ext {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = dir.join(name);
        if !fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        n += 1;
    }
}

/// Keeps only the last path component of a media file name.
fn file_component(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Sink writing into a local folder.
pub struct FolderSink {
    root: PathBuf,
    root_folder_name: String,
    fetcher: MediaFetcher,
}

impl FolderSink {
    pub fn new(root: impl Into<PathBuf>, root_folder_name: impl Into<String>) -> Self {
        Self::with_client(root, root_folder_name, reqwest::Client::new())
    }

    pub fn with_client(
        root: impl Into<PathBuf>,
        root_folder_name: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            root: root.into(),
            root_folder_name: root_folder_name.into(),
            fetcher: MediaFetcher::new(client),
        }
    }

    /// The user's downloads directory, falling back to the home directory.
    pub fn downloads(root_folder_name: impl Into<String>) -> Result<Self, StorageError> {
        let root = dirs::download_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::NotConfigured("no downloads directory".to_string()))?;
        Ok(Self::new(root, root_folder_name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every turn of the payload's conversation.
    pub fn conversation_dir(&self, payload: &TurnPayload) -> PathBuf {
        self.root
            .join(&self.root_folder_name)
            .join(payload.source.as_str())
            .join(sanitize_title(&payload.title))
    }

    /// Fetch and write each entry. Returns the entries that were written,
    /// renamed to the file actually created, and the number skipped.
    async fn save_media(&self, dir: &Path, entries: &[MediaEntry]) -> (Vec<MediaEntry>, usize) {
        if entries.is_empty() {
            return (Vec::new(), 0);
        }
        if let Err(e) = fs::create_dir_all(dir).await {
            warn!("Failed to create media directory {:?}: {}", dir, e);
            return (Vec::new(), entries.len());
        }

        let mut written = Vec::with_capacity(entries.len());
        for entry in entries {
            let result = async {
                let bytes = self.fetcher.fetch(&entry.resolved_url).await?;
                let path = unique_path(dir, file_component(&entry.filename)).await;
                fs::write(&path, bytes).await?;
                Ok::<_, StorageError>(path)
            }
            .await;

            match result {
                Ok(path) => {
                    debug!("Saved media: {:?}", path);
                    let filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| entry.filename.clone());
                    written.push(MediaEntry {
                        filename,
                        ..entry.clone()
                    });
                }
                Err(e) => warn!(
                    "Skipping media {} ({}): {}",
                    entry.filename,
                    truncate(&entry.resolved_url),
                    e
                ),
            }
        }
        let skipped = entries.len() - written.len();
        (written, skipped)
    }
}

#[async_trait]
impl TurnSink for FolderSink {
    fn name(&self) -> &str {
        "folder"
    }

    async fn save(&self, payload: &TurnPayload) -> Result<SavedTurn, StorageError> {
        let dir = self.conversation_dir(payload);
        fs::create_dir_all(&dir).await?;

        let (attachments, a_skipped) = self
            .save_media(&dir.join(ATTACHMENTS_DIR), &payload.attachments)
            .await;
        let (artifacts, r_skipped) = self
            .save_media(&dir.join(ARTIFACTS_DIR), &payload.artifacts)
            .await;
        let media_saved = attachments.len() + artifacts.len();

        // The log links only the files that exist, under their final names.
        let written = TurnPayload {
            attachments,
            artifacts,
            ..payload.clone()
        };
        let log_name = format!("{}_{}.md", payload.safe_prompt_slug, payload.timestamp);
        let log_path = unique_path(&dir, &log_name).await;
        fs::write(&log_path, render_turn(&written)).await?;

        info!(
            source = %payload.source,
            media = media_saved,
            "Turn written: {:?}",
            log_path
        );

        Ok(SavedTurn {
            location: log_path.display().to_string(),
            media_saved,
            media_skipped: a_skipped + r_skipped,
        })
    }
}

#[cfg(test)]
#[path = "folder_tests.rs"]
mod tests;
