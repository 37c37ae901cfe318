//! Golden test vectors for hash derivation and ABI selectors.
//!
//! These values were computed independently of this crate. Any change to
//! them means lectures created on a live ledger would no longer resolve.

use poap_kernel_core::{HashDeriver, HashFields, HashScheme, LectureHash, LectureParams};

/// Name of every vector's lecture.
pub const NAME: &str = "Intro to Systems";
/// Start time of the window vectors (2024-12-31T00:00:00Z).
pub const START: u64 = 1735603200;
/// End time of every vector (2025-01-01T00:00:00Z).
pub const END: u64 = 1735689600;
/// Token URI of every vector.
pub const TOKEN_URI: &str = "ipfs://Qm123";

/// A golden hash derivation.
#[derive(Debug, Clone)]
pub struct HashVector {
    pub name: &'static str,
    pub scheme: HashScheme,
    pub params: LectureParams,
    /// `0x`-prefixed lowercase hex.
    pub expected: &'static str,
}

impl HashVector {
    pub fn expected_hash(&self) -> LectureHash {
        match LectureHash::from_hex(self.expected) {
            Ok(hash) => hash,
            Err(e) => panic!("vector {} has a malformed hash: {}", self.name, e),
        }
    }

    pub fn derive(&self) -> LectureHash {
        match HashDeriver::new(self.scheme.clone()).derive(&self.params) {
            Ok(hash) => hash,
            Err(e) => panic!("vector {} does not derive: {}", self.name, e),
        }
    }
}

/// The deadline-only lecture shared by several vectors.
pub fn deadline_params() -> LectureParams {
    LectureParams::with_deadline(NAME, END, TOKEN_URI)
}

/// The windowed lecture shared by several vectors.
pub fn window_params() -> LectureParams {
    LectureParams::with_window(NAME, START, END, TOKEN_URI)
}

/// All hash vectors.
pub fn hash_vectors() -> Vec<HashVector> {
    vec![
        HashVector {
            name: "abi tuple, deadline",
            scheme: HashScheme::abi_deadline(),
            params: deadline_params(),
            expected: "0x3c63a089694196b57d7abb806fed987ac1a3c52348f7df440da28bf3aabcfc81",
        },
        HashVector {
            name: "abi tuple, window",
            scheme: HashScheme::abi_window(),
            params: window_params(),
            expected: "0xfd051c96d5b061dfb3b9975aac694fab93b3ed0ce106445653ece1d868ff27d9",
        },
        HashVector {
            name: "pipe delimited, deadline",
            scheme: HashScheme::delimited(HashFields::Deadline, "|"),
            params: deadline_params(),
            expected: "0xf1502337b7c14f83b29c573789b60711cce9273ecf9072381ede021464a368ac",
        },
        HashVector {
            name: "pipe delimited, window",
            scheme: HashScheme::delimited(HashFields::Window, "|"),
            params: window_params(),
            expected: "0xa25c1f6ee846e46b82cae1369c332604ba52e1cc37c91772ae7851b1137cf3cc",
        },
    ]
}

/// Function signatures and their 4-byte selectors, as hex.
pub const SELECTOR_VECTORS: &[(&str, &str)] = &[
    ("getLectureCount()", "2dcb6e5e"),
    ("getLecture(uint256)", "701a487e"),
    ("getLecture(bytes32)", "5ba4fcb9"),
    ("getLectureByIndex(uint256)", "cdf0370b"),
    ("lectureCounter(uint256)", "06ee3470"),
    ("hasClaimed(bytes32,address)", "92a42d1d"),
    ("hasClaimed(uint256,address)", "873f6f9e"),
    ("Error(string)", "08c379a0"),
];
