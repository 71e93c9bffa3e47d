//! Error types for emberkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using EmberError
pub type Result<T> = std::result::Result<T, EmberError>;

/// Unified error type for emberkv operations
#[derive(Debug, Error)]
pub enum EmberError {
    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File operation failed: {context}")]
    FileOperation {
        context: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Blob read failed at offset {offset} (length {length}): {source}")]
    BlobRead {
        offset: u64,
        length: u32,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Index Errors
    // -------------------------------------------------------------------------
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EmberError {
    /// Wrap an io error raised while creating, renaming or deleting a file
    pub(crate) fn file_op(context: impl Into<String>, source: std::io::Error) -> Self {
        EmberError::FileOperation {
            context: context.into(),
            source: Some(source),
        }
    }

    /// A file-level failure with no underlying io error (e.g. a missing file)
    pub(crate) fn layout(context: impl Into<String>) -> Self {
        EmberError::FileOperation {
            context: context.into(),
            source: None,
        }
    }

    /// True for the expected "absent key" outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, EmberError::KeyNotFound)
    }
}
