//! # Artifact Sync Observer
//!
//! Watches a chat page for completed turns (a user prompt plus the
//! assistant's finished response) and emits exactly one [`TurnPayload`] per
//! real turn.
//!
//! ## Components
//!
//! - [`Probe`] - stateless queries over the document (message detection,
//!   response search, streaming detection, text and image extraction)
//! - [`TurnTracker`] - the `Idle -> Recording -> Saving -> Idle` state machine
//! - [`CompletionPoller`] - bounded, cancellable retry scheduling
//! - [`TurnObserver::handle_mutations`] - the mutation listener, the only
//!   place a turn can start
//! - [`DedupGuard`] - persisted last prompt per conversation
//!
//! [`TurnObserver::run`] drives everything from a single task.
//!
//! [`TurnPayload`]: artifact_sync_protocols::TurnPayload

mod config;
mod dedup;
mod emitter;
mod error;
mod markers;
mod observer;
mod poller;
pub mod probe;
mod tracker;

pub use config::{ObserverConfig, ProbeConfig};
pub use dedup::{DedupGuard, dedup_key};
pub use emitter::{TurnContent, TurnEmitter};
pub use error::ObserverError;
pub use markers::{MARKER_ATTRIBUTE, MarkerRole};
pub use observer::{CheckOutcome, ObserverStats, TurnObserver};
pub use poller::{CompletionPoller, RetryHandle, RetryReason, RetrySlot};
pub use probe::{Classification, Probe, ProviderProfile};
pub use tracker::{PendingMedia, PromptDecision, Turn, TurnStatus, TurnTracker};

/// Re-export for callers driving [`TurnObserver::run`].
pub use tokio_util::sync::CancellationToken;
