//! Metadata store error types.

use thiserror::Error;

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Config(err.to_string())
    }
}

impl MetadataError {
    /// Map a unique-constraint violation to `AlreadyExists`.
    pub(crate) fn from_insert(err: sqlx::Error, what: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                MetadataError::AlreadyExists(what.into())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                MetadataError::Constraint(db.message().to_string())
            }
            _ => MetadataError::Database(err),
        }
    }
}
