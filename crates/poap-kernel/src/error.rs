//! Error types for the caller-facing API.

use poap_kernel_core::{CoreError, LectureHash, LectureKey};
use poap_kernel_ledger::{LedgerError, RejectReason};
use poap_kernel_metadata::MetadataError;
use poap_kernel_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the resolver, claim gate and registrar.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Malformed caller input. Never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No lecture exists under the given reference.
    #[error("lecture not found: {0}")]
    NotFound(LectureKey),

    /// The ledger could not be reached or answered garbage. Retry with
    /// backoff.
    #[error("transient ledger error: {0}")]
    Transient(#[source] LedgerError),

    /// The ledger refused on business rules.
    #[error("{0}")]
    LedgerRejected(RejectReason),

    /// A ledger-recorded hash disagrees with the locally derived one.
    #[error("hash mismatch{}: ledger has {ledger}, derived {derived}", .index.map(|i| format!(" at index {}", i)).unwrap_or_default())]
    IntegrityMismatch {
        index: Option<u64>,
        ledger: LectureHash,
        derived: LectureHash,
    },

    #[error("session store error: {0}")]
    Store(#[from] StoreError),

    /// The deployment configuration cannot serve the request.
    #[error("configuration error: {0}")]
    Config(String),
}

impl KernelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, KernelError::Transient(_))
    }

    /// The rejection reason, when the ledger refused.
    pub fn reject_reason(&self) -> Option<&RejectReason> {
        match self {
            KernelError::LedgerRejected(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<CoreError> for KernelError {
    fn from(e: CoreError) -> Self {
        KernelError::InvalidInput(e.to_string())
    }
}

impl From<LedgerError> for KernelError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Rejected(reason) => KernelError::LedgerRejected(reason),
            LedgerError::Unsupported { .. } => KernelError::Config(e.to_string()),
            other => KernelError::Transient(other),
        }
    }
}

impl From<MetadataError> for KernelError {
    fn from(e: MetadataError) -> Self {
        KernelError::Config(e.to_string())
    }
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
