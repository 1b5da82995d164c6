//! Error types for the Artifact Sync boundaries.

mod store;
mod transport;

pub use store::*;
pub use transport::*;
