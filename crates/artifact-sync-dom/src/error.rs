//! DOM errors.

use thiserror::Error;

use crate::node::NodeId;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Unknown node key: {0}")]
    UnknownKey(String),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Inserting {child} under {parent} would create a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },

    #[error("Reference node {reference} is not a child of {parent}")]
    NotAChild { parent: NodeId, reference: NodeId },
}
