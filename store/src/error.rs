//! Storage operation errors.

/// Errors surfaced by any `QuestionnaireStore` backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("no rows returned")]
    NoRows,

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("unique constraint violation: {0}")]
    UniqueViolation(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
