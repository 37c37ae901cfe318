//! # POAP Kernel Core
//!
//! Pure primitives for lecture identity: typed identifiers, Solidity ABI
//! encoding, Keccak-256 and lecture hash derivation.
//!
//! This crate contains no I/O, no ledger access, no networking.
//!
//! ## Key Types
//!
//! - [`LectureHash`] - Content-derived lecture identifier (Keccak-256)
//! - [`LectureParams`] - Immutable creation parameters
//! - [`LectureRef`] - A lecture resolved to both index and hash
//! - [`LectureKey`] - A caller-held reference in either form
//! - [`HashDeriver`] - Computes hashes under a configured [`HashScheme`]
//!
//! ## Hashing
//!
//! Hashes must match what the ledger computed at creation time. See the
//! [`hash`] and [`abi`] modules.

pub mod abi;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod lecture;
pub mod reference;
pub mod types;
pub mod validation;

pub use crypto::{keccak256, selector};
pub use error::{CoreError, Result};
pub use hash::{HashDeriver, HashEncoding, HashFields, HashScheme};
pub use lecture::{
    timestamp_from_f64, timestamp_from_i64, LectureKey, LectureParams, LectureRef, LectureWindow,
    WindowPhase,
};
pub use reference::{attend_url, parse_index, parse_reference, scan_url};
pub use types::{Address, LectureHash, TokenId, TxHash};
pub use validation::validate_params;
