/// Structured error types for comment storage.
///
/// Every backend reports failures through `StoreError` so callers can tell
/// a stale write apart from a missing row or a slow database.
use std::time::Duration;

use thiserror::Error;

/// Errors returned by a `CommentStore`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No comment with this identifier exists
    #[error("comment {id} not found")]
    NotFound { id: i64 },

    /// The stored version no longer matches the caller's expected version
    #[error("edit conflict on comment {id}")]
    EditConflict { id: i64 },

    /// The backend call exceeded its deadline (retryable)
    #[error("storage call timed out after {}ms", after.as_millis())]
    Timeout { after: Duration },

    /// Any other backend failure
    #[error("storage error: {message}")]
    Backend { message: String },
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Create a backend error from anything displayable
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            StoreError::NotFound { id: 7 }.to_string(),
            "comment 7 not found"
        );
        assert_eq!(
            StoreError::Timeout {
                after: Duration::from_secs(3)
            }
            .to_string(),
            "storage call timed out after 3000ms"
        );
        assert!(StoreError::backend("connection reset")
            .to_string()
            .contains("connection reset"));
    }
}
