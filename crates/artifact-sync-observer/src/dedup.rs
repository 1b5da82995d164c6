//! Dedup Guard - the persisted last prompt per conversation.

use std::sync::Arc;

use artifact_sync_protocols::{KeyValueStore, StoreError};
use tracing::debug;

/// Storage key holding the last saved prompt of a conversation.
pub fn dedup_key(conversation_id: &str) -> String {
    format!("last_prompt_{}", conversation_id)
}

/// Last saved prompt of one conversation, in memory and in the store.
pub struct DedupGuard {
    store: Arc<dyn KeyValueStore>,
    conversation_id: String,
    last_prompt: String,
}

impl DedupGuard {
    /// A guard that has not read the store yet.
    pub fn new(store: Arc<dyn KeyValueStore>, conversation_id: impl Into<String>) -> Self {
        Self {
            store,
            conversation_id: conversation_id.into(),
            last_prompt: String::new(),
        }
    }

    /// Read the stored value for `conversation_id`.
    pub async fn load(
        store: Arc<dyn KeyValueStore>,
        conversation_id: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let mut guard = Self::new(store, conversation_id);
        guard.last_prompt = guard.stored().await?.unwrap_or_default();
        debug!(
            conversation = %guard.conversation_id,
            has_record = !guard.last_prompt.is_empty(),
            "Dedup record loaded"
        );
        Ok(guard)
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Last saved prompt known in memory; empty when none.
    pub fn last_prompt(&self) -> &str {
        &self.last_prompt
    }

    /// Whether `prompt` equals the in-memory record.
    pub fn is_duplicate(&self, prompt: &str) -> bool {
        !prompt.is_empty() && prompt == self.last_prompt
    }

    /// Whether `prompt` equals the record currently in the store.
    ///
    /// Catches saves made by another observer of the same conversation.
    pub async fn is_recorded(&self, prompt: &str) -> Result<bool, StoreError> {
        let stored = self.stored().await?;
        Ok(!prompt.is_empty() && stored.as_deref() == Some(prompt))
    }

    /// Follow the page to another conversation and load its record.
    pub async fn switch_to(&mut self, conversation_id: impl Into<String>) -> Result<(), StoreError> {
        let conversation_id = conversation_id.into();
        if conversation_id == self.conversation_id {
            return Ok(());
        }
        debug!(from = %self.conversation_id, to = %conversation_id, "Conversation changed");
        self.conversation_id = conversation_id;
        self.last_prompt.clear();
        self.last_prompt = self.stored().await?.unwrap_or_default();
        Ok(())
    }

    /// Record `prompt` as saved.
    ///
    /// The in-memory record is updated even when the store write fails.
    pub async fn save(&mut self, prompt: &str) -> Result<(), StoreError> {
        self.last_prompt = prompt.to_string();
        self.store
            .set(&dedup_key(&self.conversation_id), prompt)
            .await
    }

    async fn stored(&self) -> Result<Option<String>, StoreError> {
        self.store.get(&dedup_key(&self.conversation_id)).await
    }
}

impl std::fmt::Debug for DedupGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupGuard")
            .field("conversation_id", &self.conversation_id)
            .field("last_prompt", &self.last_prompt)
            .finish()
    }
}
