//! Runtime settings for the observer and the probe.

use std::time::Duration;

use crate::error::ObserverError;

/// Timing and behaviour of the turn observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverConfig {
    /// Delay before the first check after a mutation batch.
    pub debounce: Duration,
    /// Delay between inconclusive checks.
    pub poll_interval: Duration,
    /// A turn unresolved this long after it started is abandoned.
    pub max_wait: Duration,
    /// Mark tracked prompt/response nodes with a data attribute.
    pub highlight_nodes: bool,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(3000),
            poll_interval: Duration::from_millis(1000),
            max_wait: Duration::from_millis(60_000),
            highlight_nodes: false,
        }
    }
}

impl ObserverConfig {
    pub fn validate(&self) -> Result<(), ObserverError> {
        if self.poll_interval.is_zero() {
            return Err(ObserverError::Config(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.max_wait <= self.debounce {
            return Err(ObserverError::Config(format!(
                "max wait ({:?}) must be longer than the debounce ({:?})",
                self.max_wait, self.debounce
            )));
        }
        Ok(())
    }
}

/// Thresholds and bounds used by the DOM probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Shortest response text accepted when the response has no image.
    pub min_response_chars: usize,
    /// Minimum width and height of a user-supplied image.
    pub attachment_min_size: u32,
    /// Minimum width and height of an assistant-produced image.
    pub artifact_min_size: u32,
    /// Forward siblings inspected per scan level.
    pub sibling_scan_limit: usize,
    /// Ancestor levels walked by the response search.
    pub ancestor_scan_depth: usize,
    /// Ancestor levels inspected for an attachment's file name.
    pub filename_ancestor_depth: usize,
    /// Fall back to a whole-document response search.
    pub allow_global_scan: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            min_response_chars: 2,
            attachment_min_size: 50,
            artifact_min_size: 100,
            sibling_scan_limit: 10,
            ancestor_scan_depth: 15,
            filename_ancestor_depth: 5,
            allow_global_scan: false,
        }
    }
}
