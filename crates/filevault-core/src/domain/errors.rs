//! Domain error types
//!
//! Validation failures raised while constructing domain values.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Path is not within the configured sync root
    #[error("Path not within sync root: {0}")]
    PathNotInSyncRoot(String),

    /// Invalid remote item ID
    #[error("Invalid item ID: {0}")]
    InvalidItemId(String),

    /// Invalid object-store reference
    #[error("Invalid storage key: {0}")]
    InvalidStorageKey(String),

    /// Invalid user identifier
    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    /// Invalid sync type label
    #[error("Invalid sync type: {0}")]
    InvalidSyncType(String),

    /// Invalid item kind label
    #[error("Invalid item kind: {0}")]
    InvalidItemKind(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidPath("relative/path".to_string());
        assert_eq!(err.to_string(), "Invalid path: relative/path");

        let err = DomainError::InvalidItemId("".to_string());
        assert_eq!(err.to_string(), "Invalid item ID: ");

        let err = DomainError::InvalidItemKind("symlink".to_string());
        assert_eq!(err.to_string(), "Invalid item kind: symlink");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidPath("/path".to_string());
        let err2 = DomainError::InvalidPath("/path".to_string());
        let err3 = DomainError::InvalidPath("/other".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
