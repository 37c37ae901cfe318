//! # POAP Kernel Testkit
//!
//! Testing utilities for the POAP Kernel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Lecture hashes and ABI selectors computed
//!   independently, so any drift in derivation is caught
//! - **Generators**: Proptest strategies for lecture parameters and schemes
//! - **Fixtures**: Kernels over in-memory ledgers with a pinned clock
//! - **Stub HTTP**: A local server for the JSON-RPC and metadata backends
//!
//! ## Golden Vectors
//!
//! ```rust
//! use poap_kernel_testkit::vectors::hash_vectors;
//!
//! for vector in hash_vectors() {
//!     assert_eq!(vector.derive(), vector.expected_hash(), "{}", vector.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use poap_kernel_testkit::generators::window_params;
//!
//! proptest! {
//!     #[test]
//!     fn hash_is_deterministic(params in window_params()) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use poap_kernel_testkit::fixtures::KernelFixture;
//! use poap_kernel::LedgerSchema;
//!
//! let fixture = KernelFixture::new(LedgerSchema::Indexed)?;
//! let lectures = fixture.seed(3, 100, 200).await?;
//! ```

pub mod fixtures;
pub mod generators;
pub mod http;
pub mod vectors;

pub use fixtures::{all_schema_fixtures, attendee, KernelFixture};
pub use http::{StubHttpServer, StubRequest, StubResponse};
