//! The tagged service result.
//!
//! Every service operation resolves to one of these variants; the transport
//! boundary translates them 1:1 to status codes and never needs to inspect
//! anything deeper.

use formway_core::navigation::NavigationError;
use formway_store::StoreError;

/// Service operation errors.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("internal error: {0}")]
    Problem(String),
}

impl ServiceError {
    /// Stable machine-readable tag, used in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Unauthorized => "unauthorized",
            ServiceError::Forbidden => "forbidden",
            ServiceError::Problem(_) => "problem",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NoRows => ServiceError::NotFound("resource"),
            StoreError::UniqueViolation(message)
            | StoreError::ConstraintViolation(message) => ServiceError::Conflict(message),
            StoreError::QueryFailed(message) | StoreError::Backend(message) => {
                ServiceError::Problem(message)
            }
        }
    }
}

impl From<NavigationError> for ServiceError {
    fn from(e: NavigationError) -> Self {
        ServiceError::Validation(e.to_string())
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
