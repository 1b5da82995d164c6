//! # Artifact Sync Config
//!
//! TOML configuration for the turn observer, the DOM probe and the storage
//! adapters.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
