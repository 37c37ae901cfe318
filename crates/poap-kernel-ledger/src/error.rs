//! Error types for the ledger boundary.

use std::fmt;

use poap_kernel_core::abi::{decode_revert, AbiReader, Revert};
use poap_kernel_core::{selector, CoreError};
use thiserror::Error;

use crate::traits::LedgerSchema;

/// Business-rule rejection reported by the ledger.
///
/// Terminal: never retried automatically. Each reason carries a message
/// fit to show an attendee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    AlreadyClaimed,
    NotYetOpen,
    Expired,
    /// Deactivated by an administrator (earliest schema only).
    Inactive,
    LectureNotFound,
    Paused,
    Unauthorized,
    Other(String),
}

/// Solidity's `Panic(uint256)` code for an out-of-bounds array access.
const PANIC_ARRAY_OUT_OF_BOUNDS: u64 = 0x32;

impl RejectReason {
    /// Map a `require`/`revert` message to a reason.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("already claimed") {
            RejectReason::AlreadyClaimed
        } else if lower.contains("not active") {
            RejectReason::Inactive
        } else if lower.contains("invalid lecture")
            || lower.contains("lecture not found")
            || lower.contains("lecture does not exist")
        {
            RejectReason::LectureNotFound
        } else if lower.contains("not started") || lower.contains("not yet open") {
            RejectReason::NotYetOpen
        } else if lower.contains("deadline") || lower.contains("expired") || lower.contains("ended") {
            RejectReason::Expired
        } else if lower.contains("paused") {
            RejectReason::Paused
        } else if lower.contains("unauthorized") || lower.contains("access denied") {
            RejectReason::Unauthorized
        } else {
            RejectReason::Other(message.to_string())
        }
    }

    /// Map raw revert data (selector + arguments) to a reason.
    pub fn from_revert_data(data: &[u8]) -> Self {
        match decode_revert(data) {
            Ok(Revert::Message(message)) => Self::from_message(&message),
            Ok(Revert::Custom(sel)) => Self::from_custom_error(sel, &data[4..]),
            Ok(Revert::Empty) => RejectReason::Other("execution reverted".into()),
            Err(e) => RejectReason::Other(format!("undecodable revert: {}", e)),
        }
    }

    fn from_custom_error(sel: [u8; 4], args: &[u8]) -> Self {
        if sel == selector("EnforcedPause()") {
            RejectReason::Paused
        } else if sel == selector("AccessControlUnauthorizedAccount(address,bytes32)") {
            RejectReason::Unauthorized
        } else if sel == selector("NotAllowed()") {
            RejectReason::Other("operation not allowed for attendance tokens".into())
        } else if sel == selector("Panic(uint256)")
            && AbiReader::new(args).u64_at(0).ok() == Some(PANIC_ARRAY_OUT_OF_BOUNDS)
        {
            RejectReason::LectureNotFound
        } else {
            RejectReason::Other(format!("custom error 0x{}", hex::encode(sel)))
        }
    }

    /// Message for the attendee.
    pub fn user_message(&self) -> String {
        match self {
            RejectReason::AlreadyClaimed => "You have already claimed this POAP.".into(),
            RejectReason::NotYetOpen => "Claiming for this lecture has not opened yet.".into(),
            RejectReason::Expired => "The claim window for this lecture has closed.".into(),
            RejectReason::Inactive => "This lecture is not active.".into(),
            RejectReason::LectureNotFound => "This lecture does not exist.".into(),
            RejectReason::Paused => "Minting is paused.".into(),
            RejectReason::Unauthorized => "The minting account is not authorized.".into(),
            RejectReason::Other(msg) => format!("The ledger rejected the request: {}", msg),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

/// Errors that can occur talking to the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Network-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not complete within its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The node answered with a JSON-RPC error that is not a revert.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The ledger rejected the call on business rules.
    #[error("rejected: {0}")]
    Rejected(RejectReason),

    /// The operation does not exist under this schema.
    #[error("{operation} is not supported by the {schema:?} schema")]
    Unsupported {
        schema: LedgerSchema,
        operation: &'static str,
    },
}

impl LedgerError {
    /// Whether a caller may retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LedgerError::Transport(_)
                | LedgerError::Timeout(_)
                | LedgerError::Rpc { .. }
                | LedgerError::Decode(_)
        )
    }
}

impl From<CoreError> for LedgerError {
    fn from(e: CoreError) -> Self {
        LedgerError::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LedgerError::Timeout(e.to_string())
        } else if e.is_decode() {
            LedgerError::Decode(e.to_string())
        } else {
            LedgerError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Decode(e.to_string())
    }
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use poap_kernel_core::abi::{encode, Token, ERROR_STRING_SELECTOR};

    fn revert_with(message: &str) -> Vec<u8> {
        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend_from_slice(&encode(&[Token::String(message)]));
        data
    }

    #[test]
    fn test_contract_messages_map_to_reasons() {
        assert_eq!(
            RejectReason::from_revert_data(&revert_with("POAP already claimed")),
            RejectReason::AlreadyClaimed
        );
        assert_eq!(
            RejectReason::from_revert_data(&revert_with("Lecture is not active")),
            RejectReason::Inactive
        );
        assert_eq!(
            RejectReason::from_revert_data(&revert_with("Invalid lecture ID")),
            RejectReason::LectureNotFound
        );
        assert_eq!(
            RejectReason::from_message("Lecture deadline has passed"),
            RejectReason::Expired
        );
    }

    #[test]
    fn test_custom_errors_map_to_reasons() {
        assert_eq!(
            RejectReason::from_revert_data(&selector("EnforcedPause()")),
            RejectReason::Paused
        );
        let mut unauthorized = selector("AccessControlUnauthorizedAccount(address,bytes32)").to_vec();
        unauthorized.extend_from_slice(&[0u8; 64]);
        assert_eq!(
            RejectReason::from_revert_data(&unauthorized),
            RejectReason::Unauthorized
        );
    }

    #[test]
    fn test_panic_out_of_bounds_is_not_found() {
        let mut data = selector("Panic(uint256)").to_vec();
        data.extend_from_slice(&encode(&[Token::Uint(0x32)]));
        assert_eq!(RejectReason::from_revert_data(&data), RejectReason::LectureNotFound);

        let mut overflow = selector("Panic(uint256)").to_vec();
        overflow.extend_from_slice(&encode(&[Token::Uint(0x11)]));
        assert!(matches!(
            RejectReason::from_revert_data(&overflow),
            RejectReason::Other(_)
        ));
    }

    #[test]
    fn test_unknown_message_is_preserved() {
        assert_eq!(
            RejectReason::from_message("gas too low"),
            RejectReason::Other("gas too low".into())
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(LedgerError::Transport("reset".into()).is_transient());
        assert!(LedgerError::Timeout("10s".into()).is_transient());
        assert!(!LedgerError::Rejected(RejectReason::AlreadyClaimed).is_transient());
        assert!(!LedgerError::Unsupported {
            schema: LedgerSchema::Sequential,
            operation: "hash_at"
        }
        .is_transient());
    }

    #[test]
    fn test_user_messages_are_specific() {
        assert!(RejectReason::AlreadyClaimed.user_message().contains("already claimed"));
        assert!(RejectReason::Expired.user_message().contains("closed"));
        assert!(RejectReason::NotYetOpen.user_message().contains("not opened"));
    }
}
