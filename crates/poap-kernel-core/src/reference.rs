//! Parsing lecture references out of user-supplied strings.
//!
//! Attendees reach a lecture through a scanned code or a link, so a
//! reference arrives as one of:
//!
//! ```text
//! 0x<64 hex>                    hash
//! 42                            0-based sequential index
//! https://host/scan#<64 hex>    scan link (hash without prefix)
//! https://host/attend/<ref>     attend link (index or hash)
//! ```
//!
//! Parsing happens before any ledger call, so malformed input is rejected
//! without touching the network.

use crate::error::{CoreError, Result};
use crate::lecture::LectureKey;
use crate::types::LectureHash;

const SCAN_MARKER: &str = "/scan#";
const ATTEND_MARKER: &str = "/attend/";

/// Parse a lecture reference.
pub fn parse_reference(input: &str) -> Result<LectureKey> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CoreError::invalid("empty lecture reference"));
    }

    if let Some(pos) = input.rfind(SCAN_MARKER) {
        let fragment = &input[pos + SCAN_MARKER.len()..];
        return parse_hash(fragment).map(LectureKey::Hash);
    }

    if let Some(pos) = input.rfind(ATTEND_MARKER) {
        let tail = &input[pos + ATTEND_MARKER.len()..];
        let segment = tail
            .split(['?', '#', '/'])
            .next()
            .unwrap_or_default();
        return parse_bare(segment);
    }

    parse_bare(input)
}

fn parse_bare(s: &str) -> Result<LectureKey> {
    if s.starts_with("0x") || s.starts_with("0X") {
        return parse_hash(s).map(LectureKey::Hash);
    }
    parse_index(s).map(LectureKey::Index)
}

fn parse_hash(s: &str) -> Result<LectureHash> {
    LectureHash::from_hex(s)
        .map_err(|e| CoreError::invalid(format!("malformed lecture hash {:?}: {}", s, e)))
}

/// Parse a 0-based sequential index. Negative, fractional and non-numeric
/// input is rejected.
pub fn parse_index(s: &str) -> Result<u64> {
    if s.is_empty() {
        return Err(CoreError::invalid("empty lecture index"));
    }
    if s.starts_with('-') {
        return Err(CoreError::invalid(format!("negative lecture index {:?}", s)));
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CoreError::invalid(format!("lecture index {:?} is not an integer", s)));
    }
    s.parse::<u64>()
        .map_err(|_| CoreError::invalid(format!("lecture index {:?} is out of range", s)))
}

/// Link an attendee follows to claim: `{base}/attend/{key}`.
pub fn attend_url(base: &str, key: &LectureKey) -> String {
    format!("{}{}{}", base.trim_end_matches('/'), ATTEND_MARKER, key)
}

/// Link encoded into a lecture's scan code: `{base}/scan#{hex}`.
pub fn scan_url(base: &str, hash: &LectureHash) -> String {
    format!(
        "{}{}{}",
        base.trim_end_matches('/'),
        SCAN_MARKER,
        hex::encode(hash.as_bytes())
    )
}
