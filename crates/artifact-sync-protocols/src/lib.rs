//! # Artifact Sync Protocols
//!
//! Shared types and boundary traits for the Artifact Sync workspace.
//! Contains only definitions - no implementations.
//!
//! ## Core Types
//!
//! - [`TurnPayload`] - The record emitted once per completed chat turn
//! - [`MediaEntry`] - An attachment or artifact referenced by a payload
//! - [`TransportMessage`] - Messages carried from the observer to the save service
//!
//! ## Boundary Traits
//!
//! - [`TurnTransport`] - Emission boundary (observer -> persistence)
//! - [`KeyValueStore`] - Durable per-installation key-value storage

pub mod error;
pub mod payload;
pub mod store;
pub mod transport;

pub use error::{StoreError, TransportError};
pub use payload::{ChatSource, MediaEntry, TurnPayload};
pub use store::KeyValueStore;
pub use transport::{TransportMessage, TurnTransport};
