//! Storage errors.

use thiserror::Error;

use artifact_sync_protocols::StoreError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Unsupported media URL: {0}")]
    UnsupportedUrl(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only file system",
        ));
        assert!(err.to_string().contains("IO error"));
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn test_fetch_error_display() {
        let err = StorageError::Fetch {
            url: "https://lh3.example.com/cat.png".to_string(),
            reason: "HTTP 404".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("cat.png"));
        assert!(display.contains("404"));
    }

    #[test]
    fn test_not_configured_display() {
        let err = StorageError::NotConfigured("missing client id".to_string());
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn test_store_error_from() {
        let err = StorageError::from(StoreError::Connection("locked".to_string()));
        assert!(matches!(err, StorageError::Store(_)));
    }
}
