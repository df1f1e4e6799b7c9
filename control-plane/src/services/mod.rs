pub mod builds;
pub mod deployments;
pub mod env_vars;
pub mod projects;
pub mod webhook;
