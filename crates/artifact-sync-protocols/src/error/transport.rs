//! Transport errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The receiving context is gone (reloaded extension, stopped service).
    #[error("Transport context invalidated: {0}")]
    ContextInvalidated(String),

    #[error("Message rejected: {0}")]
    Rejected(String),

    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// Invalidated contexts are expected during reloads and only logged quietly.
    pub fn is_context_invalidated(&self) -> bool {
        matches!(self, Self::ContextInvalidated(_) | Self::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_invalidated_error() {
        let err = TransportError::ContextInvalidated("receiver dropped".to_string());
        let display = err.to_string();
        assert!(display.contains("invalidated"));
        assert!(display.contains("receiver dropped"));
        assert!(err.is_context_invalidated());
    }

    #[test]
    fn test_rejected_error() {
        let err = TransportError::Rejected("payload too large".to_string());
        assert!(err.to_string().contains("payload too large"));
        assert!(!err.is_context_invalidated());
    }

    #[test]
    fn test_closed_counts_as_invalidated() {
        assert!(TransportError::Closed.is_context_invalidated());
    }
}
