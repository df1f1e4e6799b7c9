//! Common error taxonomy used across all services.
//!
//! Mirrors the taxonomy in the specification: validation failures map to
//! `400`, missing resources to `404`, auth failures to `401`, failed
//! downstream collaborators to `502`/`500`, and anything uncaught to a
//! generic `500`. Handlers convert a `ServiceError` into a
//! [`crate::problemdetails::Problem`] via [`crate::error_builder`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Upstream service failure: {service} - {message}")]
    UpstreamFailure { service: String, message: String },

    #[error("Deployment failure: {message}")]
    DeploymentFailure { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamFailure {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn deployment(message: impl Into<String>) -> Self {
        Self::DeploymentFailure {
            message: message.into(),
        }
    }
}

impl ServiceError {
    /// Callers holding a `sea_orm::DbErr` convert with `.to_string()` to
    /// avoid a direct `sea-orm` dependency in this crate.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }
}
