//! Debug markers on tracked nodes.
//!
//! Attribute writes never produce mutation records, so marking a node does
//! not feed back into the listener.

use artifact_sync_dom::{Document, DomError, NodeId};

/// Attribute set on marked nodes.
pub const MARKER_ATTRIBUTE: &str = "data-artifact-sync";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    Prompt,
    Response,
}

impl MarkerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prompt => "prompt",
            Self::Response => "response",
        }
    }
}

pub(crate) fn mark(doc: &mut Document, node: NodeId, role: MarkerRole) -> Result<(), DomError> {
    doc.set_attribute(node, MARKER_ATTRIBUTE, role.as_str())
}

/// Remove every marker in the document. Returns how many were removed.
pub(crate) fn clear_all(doc: &mut Document) -> Result<usize, DomError> {
    let marked: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&n| doc.attribute(n, MARKER_ATTRIBUTE).is_some())
        .collect();
    for &node in &marked {
        doc.remove_attribute(node, MARKER_ATTRIBUTE)?;
    }
    Ok(marked.len())
}
