//! Error types for KeyTable
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

use crate::bookmark::BookmarkId;

/// Result type alias using KeyTableError
pub type Result<T> = std::result::Result<T, KeyTableError>;

/// Unified error type for KeyTable operations
#[derive(Debug, Error)]
pub enum KeyTableError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Bookmark Errors
    // -------------------------------------------------------------------------
    #[error("Invalid bookmark: {0}")]
    InvalidBookmark(BookmarkId),

    #[error("Bookmark table full (limit {limit})")]
    ResourceExhausted { limit: usize },

    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Integrity Errors
    // -------------------------------------------------------------------------
    #[error("Corruption detected: {0}")]
    Corrupted(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Script Errors
    // -------------------------------------------------------------------------
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeyTableError {
    pub(crate) fn row_not_found(id: crate::key::ObjectKey) -> Self {
        KeyTableError::NotFound(format!("row {}", id))
    }
}
