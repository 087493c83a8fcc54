//! Error types for the storage layer.

use thiserror::Error;

/// Storage operation result type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLx error (connection, query, etc.)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (JSON file backend)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store cannot be reached at all
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Stored data does not decode into a valid entity
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl StoreError {
    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Whether the failure means the store is unreachable, as opposed to a
    /// failed individual operation.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Io(_) => true,
            Self::Sqlx(err) => matches!(
                err,
                sqlx::Error::PoolClosed
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::Io(_)
                    | sqlx::Error::WorkerCrashed
            ),
            Self::Serialization(_) | Self::InvalidState(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_level_failures_are_unavailable() {
        assert!(StoreError::from(sqlx::Error::PoolClosed).is_unavailable());
        assert!(StoreError::from(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(StoreError::unavailable("gone").is_unavailable());
    }

    #[test]
    fn query_failures_are_not_unavailable() {
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_unavailable());
        assert!(!StoreError::invalid_state("negative quantity").is_unavailable());
    }
}
