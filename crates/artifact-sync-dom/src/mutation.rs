//! Child-list mutation records.

use tokio::sync::mpsc;

use crate::node::NodeId;

/// One child-list change under `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

/// Records delivered together, in the order they happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    pub fn new(records: Vec<MutationRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All added nodes across the batch, in record order.
    pub fn added_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.records.iter().flat_map(|r| r.added.iter().copied())
    }
}

/// Receiving half handed out by [`crate::Document::observe`].
pub type MutationReceiver = mpsc::UnboundedReceiver<MutationBatch>;
