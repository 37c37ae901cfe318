//! # POAP Kernel Ledger
//!
//! The boundary between the kernel and the lecture contract.
//!
//! ## Key Types
//!
//! - [`LedgerReader`] / [`LedgerWriter`] - Async contract interface
//! - [`LedgerSchema`] - Which contract generation is deployed
//! - [`LedgerLecture`] - A record in that generation's shape
//! - [`MemoryLedger`] - In-process contract with failure injection
//! - [`RpcLedger`] - Read-only `eth_call` backend
//!
//! ## Usage
//!
//! ```rust,ignore
//! use poap_kernel_ledger::{LedgerReader, LedgerSchema, MemoryLedger};
//!
//! let ledger = MemoryLedger::new(LedgerSchema::Indexed);
//! let count = ledger.lecture_count().await?;
//! ```
//!
//! ## Design Notes
//!
//! - The schema is chosen at construction. Calls never probe one
//!   generation and fall back to another.
//! - Missing records are `Ok(None)`. Errors mean the call itself failed.
//! - Business-rule rejections carry a [`RejectReason`] and are terminal.

pub mod error;
pub mod memory;
pub mod rpc;
pub mod traits;

pub use error::{LedgerError, RejectReason, Result};
pub use memory::MemoryLedger;
pub use rpc::{RpcConfig, RpcLedger};
pub use traits::{
    ClaimState, CreationReceipt, LedgerKey, LedgerLecture, LedgerReader, LedgerSchema,
    LedgerWriter, MintReceipt,
};
