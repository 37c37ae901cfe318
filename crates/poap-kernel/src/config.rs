//! Deployment configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration for a local node running the current contract.
//!
//! ```toml
//! schema = "hash_primary"
//! base_url = "https://poap.example"
//!
//! [hash_scheme]
//! fields = "deadline"
//! encoding = { kind = "abi_tuple" }
//!
//! [rpc]
//! endpoint = "https://rpc.example"
//! contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3"
//!
//! [metadata]
//! timeout_secs = 5
//! gateways = [{ prefix = "ipfs://", base = "https://dweb.link/ipfs/" }]
//! ```

use std::path::Path;

use poap_kernel_core::HashScheme;
use poap_kernel_ledger::{LedgerSchema, RpcConfig};
use poap_kernel_metadata::MetadataConfig;
use poap_kernel_store::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// Settings for [`crate::IdentityResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Recompute the hash of every record that stores one and fail on a
    /// mismatch.
    pub verify_hashes: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            verify_hashes: true,
        }
    }
}

/// Top-level configuration, selected once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Contract generation the ledger runs.
    pub schema: LedgerSchema,
    /// Hash strategy. `None` uses the schema's own.
    pub hash_scheme: Option<HashScheme>,
    /// Public origin for attend and scan links.
    pub base_url: String,
    pub resolver: ResolverConfig,
    pub metadata: MetadataConfig,
    pub rpc: RpcConfig,
    pub session: SessionConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            schema: LedgerSchema::default(),
            hash_scheme: None,
            base_url: "http://localhost:3000".into(),
            resolver: ResolverConfig::default(),
            metadata: MetadataConfig::default(),
            rpc: RpcConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Parse from a TOML document.
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| KernelError::Config(format!("invalid config: {}", e)))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            KernelError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// The hash strategy in force.
    pub fn effective_hash_scheme(&self) -> HashScheme {
        self.hash_scheme
            .clone()
            .unwrap_or_else(|| self.schema.default_hash_scheme())
    }

    /// Reject combinations that cannot work.
    pub fn validate(&self) -> Result<()> {
        let scheme = self.effective_hash_scheme();
        if !self.schema.has_window() && scheme.fields == poap_kernel_core::HashFields::Window {
            return Err(KernelError::Config(format!(
                "{:?} ledgers store no start time; a window hash scheme cannot be derived",
                self.schema
            )));
        }
        if self.metadata.max_concurrency == 0 {
            return Err(KernelError::Config(
                "metadata.max_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poap_kernel_core::{Address, HashFields};
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_is_default() {
        let config = KernelConfig::from_toml("").unwrap();
        assert_eq!(config, KernelConfig::default());
        assert_eq!(config.schema, LedgerSchema::Indexed);
        assert!(config.resolver.verify_hashes);
        assert_eq!(config.metadata.timeout_secs, 10);
        assert_eq!(config.effective_hash_scheme(), HashScheme::abi_window());
    }

    #[test]
    fn test_full_document() {
        let config = KernelConfig::from_toml(
            r#"
            schema = "hash_primary"
            base_url = "https://poap.example"

            [hash_scheme]
            fields = "deadline"
            encoding = { kind = "delimited", delimiter = ":" }

            [resolver]
            verify_hashes = false

            [rpc]
            endpoint = "https://rpc.example"
            contract = "0x5FbDB2315678afecb367f032d93F642f64180aa3"

            [metadata]
            timeout_secs = 5
            gateways = [{ prefix = "ipfs://", base = "https://dweb.link/ipfs/" }]

            [session]
            ttl_secs = 3600
            "#,
        )
        .unwrap();

        assert_eq!(config.schema, LedgerSchema::HashPrimary);
        assert_eq!(
            config.effective_hash_scheme(),
            HashScheme::delimited(HashFields::Deadline, ":")
        );
        assert!(!config.resolver.verify_hashes);
        assert_eq!(
            config.rpc.contract,
            Address::parse("0x5FbDB2315678afecb367f032d93F642f64180aa3").unwrap()
        );
        assert_eq!(config.rpc.timeout_secs, 10);
        assert_eq!(config.metadata.timeout_secs, 5);
        assert_eq!(config.metadata.max_concurrency, 5);
        assert_eq!(
            config.metadata.gateways.resolve("ipfs://x").as_deref(),
            Some("https://dweb.link/ipfs/x")
        );
        assert_eq!(config.session.ttl_secs, 3600);
        config.validate().unwrap();
    }

    #[test]
    fn test_window_scheme_on_deadline_ledger_rejected() {
        let config = KernelConfig {
            schema: LedgerSchema::Sequential,
            hash_scheme: Some(HashScheme::abi_window()),
            ..KernelConfig::default()
        };
        assert!(matches!(config.validate(), Err(KernelError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "schema = \"sequential\"\n").unwrap();
        let config = KernelConfig::from_file(file.path()).unwrap();
        assert_eq!(config.schema, LedgerSchema::Sequential);
        assert_eq!(config.effective_hash_scheme(), HashScheme::abi_deadline());
    }

    #[test]
    fn test_bad_documents() {
        assert!(KernelConfig::from_toml("schema = \"v9\"").is_err());
        assert!(KernelConfig::from_file("/nonexistent/poap.toml").is_err());
    }
}
