//! The Deploy Engine client interface (spec.md §9 design note: "singleton
//! services become explicit constructor-injected dependencies"), shared
//! wire types for activation/stop/delete, artifact packaging allow-lists,
//! and the package-manager command rewrite.
//!
//! Grounded in `temps-deployer`'s `BuilderError`/`DeployerError`/
//! `BuildRequest` split (error taxonomy by concern, plain `Serialize`/
//! `Deserialize` DTOs for cross-process requests).

pub mod client;
pub mod packaging;
pub mod rewrite;
pub mod wire;

pub use client::{Deployer, DeployerError, HttpDeployer};
pub use wire::{ActivateRequest, ActivateResponse, DeleteProjectRequest, PortCheckResponse, StopRequest};
