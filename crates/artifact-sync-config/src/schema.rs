//! Configuration schema definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub observer: ObserverSection,

    #[serde(default)]
    pub probe: ProbeSection,

    #[serde(default)]
    pub storage: StorageSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// Chat provider whose page is observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    ChatGpt,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Gemini => f.write_str("gemini"),
            Provider::ChatGpt => f.write_str("chatgpt"),
        }
    }
}

/// Turn observer timing and behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserverSection {
    #[serde(default)]
    pub provider: Provider,

    /// Delay before the first check after a mutation batch.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Delay between inconclusive checks.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Turns still unresolved this long after they started are abandoned.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: u64,

    /// Shortest response text accepted without an image.
    #[serde(default = "default_min_response_chars")]
    pub min_response_chars: usize,

    /// Fall back to a whole-document search for the response.
    #[serde(default)]
    pub allow_global_scan: bool,

    /// Mark tracked prompt and response nodes with a data attribute.
    #[serde(default)]
    pub highlight_nodes: bool,
}

impl Default for ObserverSection {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_ms: default_max_wait_ms(),
            min_response_chars: default_min_response_chars(),
            allow_global_scan: false,
            highlight_nodes: false,
        }
    }
}

fn default_debounce_ms() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_wait_ms() -> u64 {
    60_000
}

fn default_min_response_chars() -> usize {
    2
}

/// DOM probe thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSection {
    /// Minimum width and height of a user-supplied image.
    #[serde(default = "default_attachment_min_size")]
    pub attachment_min_size: u32,

    /// Minimum width and height of an assistant-produced image.
    #[serde(default = "default_artifact_min_size")]
    pub artifact_min_size: u32,

    #[serde(default = "default_sibling_scan_limit")]
    pub sibling_scan_limit: usize,

    #[serde(default = "default_ancestor_scan_depth")]
    pub ancestor_scan_depth: usize,

    #[serde(default = "default_filename_ancestor_depth")]
    pub filename_ancestor_depth: usize,
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            attachment_min_size: default_attachment_min_size(),
            artifact_min_size: default_artifact_min_size(),
            sibling_scan_limit: default_sibling_scan_limit(),
            ancestor_scan_depth: default_ancestor_scan_depth(),
            filename_ancestor_depth: default_filename_ancestor_depth(),
        }
    }
}

fn default_attachment_min_size() -> u32 {
    50
}

fn default_artifact_min_size() -> u32 {
    100
}

fn default_sibling_scan_limit() -> usize {
    10
}

fn default_ancestor_scan_depth() -> usize {
    15
}

fn default_filename_ancestor_depth() -> usize {
    5
}

/// Where saved turns are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// The user's downloads directory.
    #[default]
    Local,
    /// A user-selected folder.
    Folder,
    /// Cloud drive.
    Drive,
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::Local => f.write_str("local"),
            StorageMode::Folder => f.write_str("folder"),
            StorageMode::Drive => f.write_str("drive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default)]
    pub mode: StorageMode,

    /// Folder created under the destination root.
    #[serde(default = "default_root_folder_name")]
    pub root_folder_name: String,

    /// Destination root for `mode = "folder"`.
    #[serde(default)]
    pub folder: Option<String>,

    /// SQLite file holding the dedup records.
    #[serde(default = "default_state_path")]
    pub state_path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            mode: StorageMode::default(),
            root_folder_name: default_root_folder_name(),
            folder: None,
            state_path: default_state_path(),
        }
    }
}

fn default_root_folder_name() -> String {
    "Artifact Sync".to_string()
}

fn default_state_path() -> String {
    "~/.artifact-sync/state.db".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_dir")]
    pub dir: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "~/.artifact-sync/logs".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
