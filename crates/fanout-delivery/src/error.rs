//! Error types for delivery operations.
//!
//! Attempt-level failures (timeout, transport, non-2xx) are outcomes,
//! not errors: they live in [`crate::client::AttemptOutcome`] and drive
//! retries. `DeliveryError` covers the failures that abort a sequence
//! outright.

use thiserror::Error;

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Errors that abort a delivery sequence.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The HTTP client could not be constructed.
    #[error("invalid delivery client configuration: {message}")]
    Configuration {
        /// What was wrong with the configuration.
        message: String,
    },

    /// A storage operation failed mid-sequence.
    #[error("storage error during delivery: {0}")]
    Storage(#[from] fanout_core::StoreError),
}

impl DeliveryError {
    /// Creates a configuration error from a message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }
}
