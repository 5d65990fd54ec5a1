//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid approval status: {0}")]
    InvalidApprovalStatus(String),

    #[error("invalid product: {0}")]
    InvalidProduct(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid notification kind: {0}")]
    InvalidNotification(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
