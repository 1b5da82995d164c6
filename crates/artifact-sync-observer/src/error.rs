//! Observer errors.

use thiserror::Error;

use artifact_sync_dom::DomError;
use artifact_sync_protocols::StoreError;

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    #[error("Invalid observer configuration: {0}")]
    Config(String),
}
