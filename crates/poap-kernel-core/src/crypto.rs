//! Cryptographic primitives: Keccak-256 as the ledger computes it.
//!
//! This is the original Keccak padding, not NIST SHA3-256. The two differ in
//! the domain byte and produce different digests for the same input.

use sha3::{Digest, Keccak256};

/// Compute the Keccak-256 digest of `data`.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// The 4-byte function selector for a canonical signature such as
/// `hasClaimed(bytes32,address)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_empty() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_keccak_abc() {
        assert_eq!(
            hex::encode(keccak256(b"abc")),
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn test_selectors() {
        assert_eq!(hex::encode(selector("getLectureCount()")), "2dcb6e5e");
        assert_eq!(hex::encode(selector("hasClaimed(bytes32,address)")), "92a42d1d");
        assert_eq!(hex::encode(selector("Error(string)")), "08c379a0");
    }
}
