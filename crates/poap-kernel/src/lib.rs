//! # POAP Kernel
//!
//! The identity layer for lecture proof-of-attendance tokens.
//!
//! ## Overview
//!
//! A lecture has two identifiers: a sequential index assigned by the ledger
//! at creation, and a content hash derived from its parameters. This crate
//! keeps the two consistent across three generations of the contract:
//!
//! - **Resolution**: turn an index, hash or link into a [`LectureRef`]
//! - **Claims**: check and submit attendance claims with a specific
//!   rejection reason
//! - **Creation**: predict a lecture's hash, create it, verify the ledger
//!   agreed
//! - **Metadata**: fetch token metadata into one normalized shape
//!
//! ## Usage
//!
//! ```rust,no_run
//! use poap_kernel::{KernelConfig, LectureKey, LectureParams, PoapKernel};
//! use poap_kernel::core::Address;
//!
//! async fn example() -> poap_kernel::Result<()> {
//!     let (kernel, _ledger) = PoapKernel::in_memory(KernelConfig::default())?;
//!
//!     let created = kernel
//!         .registrar()
//!         .create(&LectureParams::with_window(
//!             "Intro to Systems",
//!             1735603200,
//!             1735689600,
//!             "ipfs://Qm123",
//!         ))
//!         .await?;
//!
//!     let attendee = Address::parse("0x00000000000000000000000000000000000000aa")?;
//!     let status = kernel
//!         .claims()
//!         .check_claimable(&LectureKey::Hash(created.lecture.hash), &attendee)
//!         .await?;
//!     println!("{:?}", status);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - The ledger schema is chosen once, in [`KernelConfig`]. A failed lookup
//!   is never retried under a different schema.
//! - Read failures surface as [`KernelError::Transient`], never as
//!   "not found".
//! - The claim gate is an optimization. The ledger is the only authority on
//!   whether a claim succeeds.
//!
//! ## Re-exports
//!
//! - `poap_kernel::core` - Hashing, ABI and identifiers
//! - `poap_kernel::ledger` - Ledger traits and backends
//! - `poap_kernel::metadata` - Metadata normalization
//! - `poap_kernel::store` - Admin session persistence

pub mod claim;
pub mod config;
pub mod error;
pub mod kernel;
pub mod registrar;
pub mod resolver;

pub use poap_kernel_core as core;
pub use poap_kernel_ledger as ledger;
pub use poap_kernel_metadata as metadata;
pub use poap_kernel_store as store;

pub use claim::{ClaimGate, ClaimReceipt, ClaimStatus};
pub use config::{KernelConfig, ResolverConfig};
pub use error::{KernelError, Result};
pub use kernel::PoapKernel;
pub use registrar::{parse_utc, BatchItem, CreatedLecture, LectureDraft, LectureRegistrar};
pub use resolver::{IdentityResolver, ListOrder};

pub use poap_kernel_core::{
    Address, HashDeriver, HashScheme, LectureHash, LectureKey, LectureParams, LectureRef, TokenId,
};
pub use poap_kernel_ledger::{LedgerSchema, RejectReason};
pub use poap_kernel_metadata::{FetchOptions, TokenMetadata};

/// Current Unix time in seconds.
pub(crate) fn now_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
