//! # POAP Kernel Metadata
//!
//! Best-effort retrieval of off-chain token metadata.
//!
//! ## Key Types
//!
//! - [`MetadataNormalizer`] - Fetches with bounded timeout, body size and
//!   concurrency
//! - [`TokenMetadata`] - A document with every field populated
//! - [`GatewayRules`] - Prefix table turning `ipfs://` references into URLs
//!
//! ## Failure Model
//!
//! [`MetadataNormalizer::fetch`] is total: timeouts, non-2xx responses and
//! malformed JSON all yield [`TokenMetadata::placeholder`]. A document that
//! parses but lacks fields is filled with defaults. Nothing is cached and
//! nothing is retried here.

pub mod error;
pub mod gateway;
pub mod metadata;
pub mod normalizer;

pub use error::{MetadataError, Result};
pub use gateway::{GatewayRule, GatewayRules, DEFAULT_IPFS_GATEWAY};
pub use metadata::{normalize, normalize_bytes, Attribute, TokenMetadata};
pub use normalizer::{FetchOptions, MetadataConfig, MetadataNormalizer};
