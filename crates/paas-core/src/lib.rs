//! Core types and utilities shared across all build-and-deploy services.

pub mod config;
pub mod encryption;
pub mod error;
pub mod error_builder;
pub mod problemdetails;
pub mod types;

pub use config::*;
pub use encryption::EncryptionService;
pub use error::*;
pub use problemdetails::ProblemDetails;
pub use types::*;

// Re-export external dependencies used in crate-public signatures.
pub use anyhow;
pub use chrono;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tracing;
pub use uuid;

/// Timestamp type used consistently across entities and wire types.
pub type UtcDateTime = chrono::DateTime<chrono::Utc>;
