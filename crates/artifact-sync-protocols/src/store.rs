//! Durable key-value storage boundary.

use async_trait::async_trait;

use crate::error::StoreError;

/// Per-installation key-value store.
///
/// Used by the dedup guard (`last_prompt_{conversation}`) and available to
/// settings consumers.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
