//! Lecture hash derivation.
//!
//! A lecture hash is `keccak256(encode(fields))`. Which fields and which
//! encoding a deployment uses is fixed when its contract was written, so
//! both are configuration ([`HashScheme`]), never inferred from inputs.
//!
//! Field order and primitive widths are part of the contract: `string`,
//! `uint256` timestamp(s), `string`. Reordering or narrowing a field
//! changes every hash.

use serde::{Deserialize, Serialize};

use crate::abi::{self, Token};
use crate::crypto::keccak256;
use crate::error::{CoreError, Result};
use crate::lecture::LectureParams;
use crate::types::LectureHash;

/// Default delimiter for [`HashEncoding::Delimited`].
pub const DEFAULT_DELIMITER: &str = "|";

/// How the hashed fields are serialized before hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HashEncoding {
    /// Canonical ABI tuple encoding (`abi.encode(...)`).
    AbiTuple,
    /// UTF-8 of the decimal-rendered fields joined by `delimiter`.
    Delimited {
        #[serde(default = "default_delimiter")]
        delimiter: String,
    },
}

fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

/// Which fields participate in the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashFields {
    /// `(name, endTime, tokenURI)`.
    Deadline,
    /// `(name, startTime, endTime, tokenURI)`.
    Window,
}

/// A complete hash strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashScheme {
    pub encoding: HashEncoding,
    pub fields: HashFields,
}

impl HashScheme {
    /// ABI tuple over `(name, endTime, tokenURI)`.
    pub fn abi_deadline() -> Self {
        Self {
            encoding: HashEncoding::AbiTuple,
            fields: HashFields::Deadline,
        }
    }

    /// ABI tuple over `(name, startTime, endTime, tokenURI)`.
    pub fn abi_window() -> Self {
        Self {
            encoding: HashEncoding::AbiTuple,
            fields: HashFields::Window,
        }
    }

    /// Delimiter-joined string over the given fields.
    pub fn delimited(fields: HashFields, delimiter: impl Into<String>) -> Self {
        Self {
            encoding: HashEncoding::Delimited {
                delimiter: delimiter.into(),
            },
            fields,
        }
    }
}

impl Default for HashScheme {
    fn default() -> Self {
        Self::abi_window()
    }
}

/// Computes lecture hashes under one configured scheme.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HashDeriver {
    scheme: HashScheme,
}

impl HashDeriver {
    pub fn new(scheme: HashScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> &HashScheme {
        &self.scheme
    }

    /// The exact bytes that are hashed.
    pub fn preimage(&self, params: &LectureParams) -> Result<Vec<u8>> {
        let start = match self.scheme.fields {
            HashFields::Deadline => None,
            HashFields::Window => Some(params.start_time.ok_or_else(|| {
                CoreError::invalid("window hash scheme requires a start time")
            })?),
        };

        let bytes = match &self.scheme.encoding {
            HashEncoding::AbiTuple => {
                let mut tokens = Vec::with_capacity(4);
                tokens.push(Token::String(&params.name));
                if let Some(start) = start {
                    tokens.push(Token::Uint(u128::from(start)));
                }
                tokens.push(Token::Uint(u128::from(params.end_time)));
                tokens.push(Token::String(&params.token_uri));
                abi::encode(&tokens)
            }
            HashEncoding::Delimited { delimiter } => {
                let mut parts = vec![params.name.clone()];
                if let Some(start) = start {
                    parts.push(start.to_string());
                }
                parts.push(params.end_time.to_string());
                parts.push(params.token_uri.clone());
                parts.join(delimiter).into_bytes()
            }
        };
        Ok(bytes)
    }

    /// Derive the lecture hash. Pure: no ledger access.
    pub fn derive(&self, params: &LectureParams) -> Result<LectureHash> {
        let preimage = self.preimage(params)?;
        Ok(LectureHash(keccak256(&preimage)))
    }

    /// Check a ledger-reported hash against the locally derived one.
    pub fn matches(&self, params: &LectureParams, hash: &LectureHash) -> Result<bool> {
        Ok(self.derive(params)? == *hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> LectureParams {
        LectureParams::with_deadline("Intro to Systems", 1735689600, "ipfs://Qm123")
    }

    #[test]
    fn test_abi_deadline_golden() {
        let hash = HashDeriver::new(HashScheme::abi_deadline())
            .derive(&scenario())
            .unwrap();
        assert_eq!(
            hash.to_hex(),
            "0x3c63a089694196b57d7abb806fed987ac1a3c52348f7df440da28bf3aabcfc81"
        );
    }

    #[test]
    fn test_abi_window_golden() {
        let params = LectureParams::with_window(
            "Intro to Systems",
            1735603200,
            1735689600,
            "ipfs://Qm123",
        );
        let hash = HashDeriver::new(HashScheme::abi_window())
            .derive(&params)
            .unwrap();
        assert_eq!(
            hash.to_hex(),
            "0xfd051c96d5b061dfb3b9975aac694fab93b3ed0ce106445653ece1d868ff27d9"
        );
    }

    #[test]
    fn test_delimited_golden() {
        let deriver = HashDeriver::new(HashScheme::delimited(HashFields::Deadline, "|"));
        assert_eq!(
            deriver.derive(&scenario()).unwrap().to_hex(),
            "0xf1502337b7c14f83b29c573789b60711cce9273ecf9072381ede021464a368ac"
        );
        assert_eq!(
            deriver.preimage(&scenario()).unwrap(),
            b"Intro to Systems|1735689600|ipfs://Qm123".to_vec()
        );
    }

    #[test]
    fn test_schemes_disagree() {
        let params = LectureParams::with_window(
            "Intro to Systems",
            1735603200,
            1735689600,
            "ipfs://Qm123",
        );
        let a = HashDeriver::new(HashScheme::abi_deadline()).derive(&params).unwrap();
        let b = HashDeriver::new(HashScheme::abi_window()).derive(&params).unwrap();
        let c = HashDeriver::new(HashScheme::delimited(HashFields::Window, "|"))
            .derive(&params)
            .unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
    }

    #[test]
    fn test_window_scheme_requires_start() {
        let deriver = HashDeriver::new(HashScheme::abi_window());
        assert!(matches!(
            deriver.derive(&scenario()),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_deadline_scheme_ignores_start() {
        let deriver = HashDeriver::new(HashScheme::abi_deadline());
        let mut with_start = scenario();
        with_start.start_time = Some(1);
        assert_eq!(
            deriver.derive(&with_start).unwrap(),
            deriver.derive(&scenario()).unwrap()
        );
    }

    #[test]
    fn test_matches() {
        let deriver = HashDeriver::new(HashScheme::abi_deadline());
        let hash = deriver.derive(&scenario()).unwrap();
        assert!(deriver.matches(&scenario(), &hash).unwrap());
        assert!(!deriver.matches(&scenario(), &LectureHash::ZERO).unwrap());
    }

    #[test]
    fn test_scheme_serde() {
        let scheme: HashScheme =
            serde_json::from_str(r#"{"encoding":{"kind":"delimited"},"fields":"window"}"#).unwrap();
        assert_eq!(scheme, HashScheme::delimited(HashFields::Window, "|"));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn derive_is_deterministic(name in ".{0,40}", end in any::<u64>(), uri in ".{0,60}") {
                let deriver = HashDeriver::new(HashScheme::abi_deadline());
                let params = LectureParams::with_deadline(name, end, uri);
                prop_assert_eq!(deriver.derive(&params).unwrap(), deriver.derive(&params).unwrap());
            }

            #[test]
            fn changing_end_time_changes_hash(name in ".{0,40}", end in 0u64..u64::MAX, uri in ".{0,60}") {
                let deriver = HashDeriver::new(HashScheme::abi_deadline());
                let a = LectureParams::with_deadline(name.clone(), end, uri.clone());
                let b = LectureParams::with_deadline(name, end + 1, uri);
                prop_assert_ne!(deriver.derive(&a).unwrap(), deriver.derive(&b).unwrap());
            }
        }
    }
}
