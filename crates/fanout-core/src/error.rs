//! Error types for storage operations.
//!
//! The key/value contract is deliberately small, so the error surface is
//! too: a record can fail to encode, a stored record can fail to decode,
//! or the backing store can be unreachable.

use thiserror::Error;

/// Result type alias using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the key/value store and the repositories over it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record could not be serialized before writing.
    #[error("failed to encode record: {0}")]
    Encode(serde_json::Error),

    /// A stored record could not be parsed back into its domain type.
    #[error("invalid stored record at {key}: {source}")]
    InvalidRecord {
        /// Key the unreadable record was found under.
        key: String,
        /// Underlying JSON parse failure.
        source: serde_json::Error,
    },
}

impl StoreError {
    /// Creates an unavailable error from a message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}
