//! Error types for metadata fetching.

use thiserror::Error;

/// Why a metadata fetch did not produce a document.
///
/// [`crate::MetadataNormalizer::fetch`] converts all of these into a
/// placeholder; they surface only through `try_fetch`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// No gateway rule turns the reference into an HTTP URL.
    #[error("unresolvable metadata reference: {0}")]
    Unresolvable(String),

    #[error("metadata fetch timed out: {0}")]
    Timeout(String),

    #[error("metadata server returned HTTP {status}")]
    Http { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("metadata body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// The body is not a JSON object.
    #[error("malformed metadata: {0}")]
    Malformed(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for MetadataError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            MetadataError::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            MetadataError::Http {
                status: status.as_u16(),
            }
        } else {
            MetadataError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for MetadataError {
    fn from(e: serde_json::Error) -> Self {
        MetadataError::Malformed(e.to_string())
    }
}

/// Result type for metadata operations.
pub type Result<T> = std::result::Result<T, MetadataError>;
