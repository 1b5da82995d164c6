//! Replayable document operations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Document;
use crate::error::DomError;
use crate::node::NodeId;
use crate::selector::Selector;
use crate::spec::ElementSpec;

/// One recorded page operation.
///
/// Node references are strings: `"body"`, a key assigned by an
/// [`ElementSpec`], or `"css:<selector>"` for the first matching element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DomOp {
    Append {
        parent: String,
        node: ElementSpec,
    },
    InsertBefore {
        parent: String,
        before: String,
        node: ElementSpec,
    },
    Remove {
        target: String,
    },
    Replace {
        target: String,
        node: ElementSpec,
    },
    SetText {
        target: String,
        text: String,
    },
    SetAttr {
        target: String,
        name: String,
        value: String,
    },
    RemoveAttr {
        target: String,
        name: String,
    },
    SetTitle {
        title: String,
    },
}

/// Applies [`DomOp`]s to a document, remembering keyed nodes.
#[derive(Debug, Default)]
pub struct DomScript {
    keys: HashMap<String, NodeId>,
}

impl DomScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node registered under `key` by an earlier op.
    pub fn node(&self, key: &str) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    fn resolve(&self, doc: &Document, reference: &str) -> Result<NodeId, DomError> {
        if reference == "body" {
            return Ok(doc.body());
        }
        if let Some(css) = reference.strip_prefix("css:") {
            let selector = Selector::parse(css)?;
            return doc
                .query_selector(doc.root(), &selector)
                .ok_or_else(|| DomError::UnknownKey(reference.to_string()));
        }
        self.node(reference)
            .ok_or_else(|| DomError::UnknownKey(reference.to_string()))
    }

    /// Apply one op. Mutations are recorded but not flushed.
    pub fn apply(&mut self, doc: &mut Document, op: &DomOp) -> Result<(), DomError> {
        debug!(?op, "Applying DOM op");
        match op {
            DomOp::Append { parent, node } => {
                let parent = self.resolve(doc, parent)?;
                let child = doc.instantiate(node, &mut self.keys);
                doc.append_child(parent, child)
            }
            DomOp::InsertBefore {
                parent,
                before,
                node,
            } => {
                let parent = self.resolve(doc, parent)?;
                let before = self.resolve(doc, before)?;
                let child = doc.instantiate(node, &mut self.keys);
                doc.insert_before(parent, child, before)
            }
            DomOp::Remove { target } => {
                let target = self.resolve(doc, target)?;
                doc.remove(target)
            }
            DomOp::Replace { target, node } => {
                let target = self.resolve(doc, target)?;
                let replacement = doc.instantiate(node, &mut self.keys);
                doc.replace(target, replacement)
            }
            DomOp::SetText { target, text } => {
                let target = self.resolve(doc, target)?;
                doc.set_text(target, text.clone())
            }
            DomOp::SetAttr {
                target,
                name,
                value,
            } => {
                let target = self.resolve(doc, target)?;
                doc.set_attribute(target, name, value)
            }
            DomOp::RemoveAttr { target, name } => {
                let target = self.resolve(doc, target)?;
                doc.remove_attribute(target, name)
            }
            DomOp::SetTitle { title } => {
                doc.set_title(title.clone());
                Ok(())
            }
        }
    }
}
