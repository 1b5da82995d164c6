//! # Artifact Sync DOM
//!
//! A small in-process document model standing in for the live page of a chat
//! UI. It provides what the turn observer needs and nothing more:
//!
//! - an arena of element/text nodes with stable [`NodeId`]s (ids are never
//!   reused, so a stale id can always be asked whether it is still connected)
//! - document-order comparison ([`DocumentPosition`])
//! - a minimal selector engine ([`Selector`]) covering tag, class and
//!   attribute matches joined by commas
//! - child-list mutation records delivered in batches over a tokio channel,
//!   like a `MutationObserver` observing `{ childList: true, subtree: true }`
//! - declarative node specs and a replayable op script for traces and tests

mod document;
mod error;
mod mutation;
mod node;
mod script;
mod selector;
mod spec;

pub use document::{Document, DocumentPosition, SharedDocument};
pub use error::DomError;
pub use mutation::{MutationBatch, MutationReceiver, MutationRecord};
pub use node::{NodeData, NodeId};
pub use script::{DomOp, DomScript};
pub use selector::Selector;
pub use spec::ElementSpec;
