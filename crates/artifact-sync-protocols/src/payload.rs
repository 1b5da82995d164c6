//! Turn payload definitions.
//!
//! A [`TurnPayload`] is assembled exactly once per completed, non-duplicate
//! chat turn and handed to the transport. It is never mutated afterwards.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of the prompt slug used in file names.
pub const PROMPT_SLUG_LEN: usize = 40;

/// Chat provider a turn was captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatSource {
    Gemini,
    #[serde(rename = "ChatGPT")]
    ChatGpt,
}

impl ChatSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini",
            Self::ChatGpt => "ChatGPT",
        }
    }
}

impl fmt::Display for ChatSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image or file referenced by a turn.
///
/// Attachments are supplied by the user, artifacts are produced by the assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaEntry {
    /// Target file name, already prefixed with the prompt slug and timestamp.
    pub filename: String,
    /// Absolute (or `data:`/`blob:`) URL of the media.
    pub resolved_url: String,
    /// Alt text or the human readable name of the media.
    pub alt_text: String,
}

impl MediaEntry {
    pub fn new(
        filename: impl Into<String>,
        resolved_url: impl Into<String>,
        alt_text: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            resolved_url: resolved_url.into(),
            alt_text: alt_text.into(),
        }
    }
}

/// The record emitted for one completed turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnPayload {
    pub source: ChatSource,
    pub title: String,
    pub prompt: String,
    pub response: String,
    /// File-name safe ISO-8601 timestamp (see [`timestamp_slug`]).
    pub timestamp: String,
    pub safe_prompt_slug: String,
    #[serde(default)]
    pub attachments: Vec<MediaEntry>,
    #[serde(default)]
    pub artifacts: Vec<MediaEntry>,
}

impl TurnPayload {
    /// Total number of media entries carried by the payload.
    pub fn media_count(&self) -> usize {
        self.attachments.len() + self.artifacts.len()
    }
}

/// Format a timestamp as ISO-8601 with `:` and `.` replaced by `-`.
///
/// `2024-05-01T10:20:30.123Z` becomes `2024-05-01T10-20-30-123Z`.
pub fn timestamp_slug(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-")
}

/// Replace every non alphanumeric ASCII character with `_` and keep the first
/// [`PROMPT_SLUG_LEN`] characters.
pub fn safe_prompt_slug(prompt: &str) -> String {
    prompt
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(PROMPT_SLUG_LEN)
        .collect()
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
