//! Ergonomic construction of [`crate::problemdetails::Problem`] responses,
//! plus the mapping from [`crate::error::ServiceError`] to an HTTP response.

use crate::error::ServiceError;
use crate::problemdetails::{self, Problem};
use axum::http::StatusCode;
use serde::Serialize;
use std::collections::HashMap;

pub struct ErrorBuilder {
    status: StatusCode,
    type_: String,
    title: String,
    detail: String,
    values: HashMap<String, serde_json::Value>,
}

impl ErrorBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            type_: String::new(),
            title: String::new(),
            detail: String::new(),
            values: HashMap::new(),
        }
    }

    pub fn type_(mut self, type_: impl Into<String>) -> Self {
        self.type_ = type_.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn value<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.values.insert(key.to_string(), value);
        }
        self
    }

    pub fn build(self) -> Problem {
        let mut problem = problemdetails::new(self.status)
            .with_type(self.type_)
            .with_title(self.title)
            .with_detail(self.detail)
            .with_value("timestamp", chrono::Utc::now().to_rfc3339());

        for (key, value) in self.values {
            problem = problem.with_value(&key, value);
        }

        problem
    }
}

pub fn validation_error(message: impl Into<String>) -> Problem {
    ErrorBuilder::new(StatusCode::BAD_REQUEST)
        .type_("https://errors.example/probs/validation-error")
        .title("Validation Error")
        .detail(message)
        .build()
}

pub fn not_found(message: impl Into<String>) -> Problem {
    ErrorBuilder::new(StatusCode::NOT_FOUND)
        .type_("https://errors.example/probs/not-found")
        .title("Not Found")
        .detail(message)
        .build()
}

pub fn unauthorized(message: impl Into<String>) -> Problem {
    ErrorBuilder::new(StatusCode::UNAUTHORIZED)
        .type_("https://errors.example/probs/unauthorized")
        .title("Unauthorized")
        .detail(message)
        .build()
}

pub fn upstream_failure(message: impl Into<String>) -> Problem {
    ErrorBuilder::new(StatusCode::BAD_GATEWAY)
        .type_("https://errors.example/probs/upstream-failure")
        .title("Upstream Failure")
        .detail(message)
        .build()
}

pub fn internal_server_error(message: impl Into<String>) -> Problem {
    ErrorBuilder::new(StatusCode::INTERNAL_SERVER_ERROR)
        .type_("https://errors.example/probs/internal-server-error")
        .title("Internal Server Error")
        .detail(message)
        .build()
}

impl From<ServiceError> for Problem {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation { message } => validation_error(message),
            ServiceError::NotFound { resource } => not_found(format!("{resource} not found")),
            ServiceError::Unauthorized { reason } => unauthorized(reason),
            ServiceError::UpstreamFailure { service, message } => {
                upstream_failure(format!("{service}: {message}"))
            }
            ServiceError::DeploymentFailure { message } => ErrorBuilder::new(StatusCode::CONFLICT)
                .type_("https://errors.example/probs/deployment-failure")
                .title("Deployment Failure")
                .detail(message)
                .build(),
            ServiceError::Database(message) => internal_server_error(message),
            ServiceError::Internal(err) => internal_server_error(err.to_string()),
        }
    }
}
