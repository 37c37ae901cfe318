//! Error types for the POAP kernel core.

use thiserror::Error;

/// Errors raised by the pure core: parsing, encoding, hash derivation.
///
/// Every variant is a caller bug (malformed input). None of them is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("abi decoding error: {0}")]
    AbiDecode(String),
}

impl CoreError {
    /// Shorthand for an `InvalidInput` error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        CoreError::InvalidInput(msg.into())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
