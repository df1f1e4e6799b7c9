//! Persisted entities for the build-and-deploy pipeline: one module per
//! table, following the teacher's `temps-entities` layout.

pub mod builds;
pub mod deployments;
pub mod environment_variables;
pub mod log_entries;
pub mod prelude;
pub mod projects;
pub mod source_installations;

pub use prelude::*;
