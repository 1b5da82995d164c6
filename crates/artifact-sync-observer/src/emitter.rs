//! Payload assembly and hand-off to the transport.

use std::sync::Arc;

use artifact_sync_protocols::payload::{safe_prompt_slug, timestamp_slug};
use artifact_sync_protocols::{
    ChatSource, MediaEntry, TransportError, TransportMessage, TurnPayload, TurnTransport,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use url::Url;

use crate::probe::is_image_file_name;
use crate::tracker::PendingMedia;

/// Everything captured for a completed turn.
#[derive(Debug, Clone, Default)]
pub struct TurnContent {
    pub title: String,
    pub prompt: String,
    pub response: String,
    pub attachments: Vec<PendingMedia>,
    pub artifacts: Vec<PendingMedia>,
}

/// Resolve an image `src` against the page address.
///
/// `data:` and `blob:` URLs are kept as they are; unparsable input is
/// returned unchanged.
pub(crate) fn resolve_url(page_url: &str, src: &str) -> String {
    if src.starts_with("data:") || src.starts_with("blob:") {
        return src.to_string();
    }
    Url::parse(page_url)
        .and_then(|base| base.join(src))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| src.to_string())
}

fn index_suffix(index: usize, total: usize) -> String {
    if total > 1 {
        format!("_{}", index + 1)
    } else {
        String::new()
    }
}

fn attachment_filename(prefix: &str, name: Option<&str>, index: usize, total: usize) -> String {
    let name = format!("{}{}", name.unwrap_or("attachment"), index_suffix(index, total));
    if is_image_file_name(&name) {
        format!("{}_{}", prefix, name)
    } else {
        format!("{}_{}.png", prefix, name)
    }
}

fn artifact_filename(prefix: &str, index: usize, total: usize) -> String {
    format!("{}{}.png", prefix, index_suffix(index, total))
}

/// Build the payload for `content` captured at `at`.
pub fn build_payload(source: ChatSource, content: &TurnContent, at: DateTime<Utc>) -> TurnPayload {
    let timestamp = timestamp_slug(at);
    let slug = safe_prompt_slug(&content.prompt);
    let prefix = format!("{}_{}", slug, timestamp);

    let total = content.attachments.len();
    let attachments = content
        .attachments
        .iter()
        .enumerate()
        .map(|(i, media)| {
            MediaEntry::new(
                attachment_filename(&prefix, media.suggested_filename.as_deref(), i, total),
                media.source_url.clone(),
                media.alt_text.clone(),
            )
        })
        .collect();

    let total = content.artifacts.len();
    let artifacts = content
        .artifacts
        .iter()
        .enumerate()
        .map(|(i, media)| {
            MediaEntry::new(
                artifact_filename(&prefix, i, total),
                media.source_url.clone(),
                media.alt_text.clone(),
            )
        })
        .collect();

    TurnPayload {
        source,
        title: content.title.clone(),
        prompt: content.prompt.clone(),
        response: content.response.clone(),
        timestamp,
        safe_prompt_slug: slug,
        attachments,
        artifacts,
    }
}

/// Sends payloads for one provider.
pub struct TurnEmitter {
    source: ChatSource,
    transport: Arc<dyn TurnTransport>,
}

impl TurnEmitter {
    pub fn new(source: ChatSource, transport: Arc<dyn TurnTransport>) -> Self {
        Self { source, transport }
    }

    pub fn source(&self) -> ChatSource {
        self.source
    }

    pub fn build(&self, content: &TurnContent, at: DateTime<Utc>) -> TurnPayload {
        build_payload(self.source, content, at)
    }

    /// Hand `payload` to the transport once.
    ///
    /// Failures are logged here and returned so the caller can skip the
    /// dedup write. Nothing is retried.
    pub async fn emit(&self, payload: TurnPayload) -> Result<(), TransportError> {
        let media = payload.media_count();
        let slug = payload.safe_prompt_slug.clone();
        match self.transport.send(TransportMessage::SaveTurn(payload)).await {
            Ok(()) => {
                info!(source = %self.source, media, "Turn sent: {}", slug);
                Ok(())
            }
            Err(e) if e.is_context_invalidated() => {
                info!("Transport unavailable, turn dropped: {}", e);
                debug!(slug = %slug, "Dropped payload");
                Err(e)
            }
            Err(e) => {
                warn!("Failed to send turn {}: {}", slug, e);
                Err(e)
            }
        }
    }
}
