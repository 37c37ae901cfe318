//! Proptest generators for property-based testing.

use proptest::prelude::*;

use poap_kernel_core::{Address, HashFields, HashScheme, LectureHash, LectureParams};

/// A non-blank lecture name.
pub fn lecture_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 .,:-]{0,47}".prop_map(String::from)
}

/// An `ipfs://` or `https://` token URI.
pub fn token_uri() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9]{10,46}".prop_map(|cid| format!("ipfs://Qm{}", cid)),
        "[a-z]{3,12}".prop_map(|path| format!("https://meta.example/{}.json", path)),
    ]
}

/// A Unix timestamp between 2020 and 2040.
pub fn timestamp() -> impl Strategy<Value = u64> {
    1_577_836_800u64..2_208_988_800u64
}

/// Parameters with a start time strictly before the end.
pub fn window_params() -> impl Strategy<Value = LectureParams> {
    (lecture_name(), timestamp(), 1u64..=30 * 86_400, token_uri()).prop_map(
        |(name, start, len, uri)| LectureParams::with_window(name, start, start + len, uri),
    )
}

/// Parameters carrying an end time only.
pub fn deadline_params() -> impl Strategy<Value = LectureParams> {
    (lecture_name(), timestamp(), token_uri())
        .prop_map(|(name, end, uri)| LectureParams::with_deadline(name, end, uri))
}

/// Any valid parameters.
pub fn lecture_params() -> impl Strategy<Value = LectureParams> {
    prop_oneof![window_params(), deadline_params()]
}

pub fn lecture_hash() -> impl Strategy<Value = LectureHash> {
    any::<[u8; 32]>().prop_map(LectureHash::from_bytes)
}

pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// Any supported hash scheme.
pub fn hash_scheme() -> impl Strategy<Value = HashScheme> {
    let fields = prop_oneof![Just(HashFields::Deadline), Just(HashFields::Window)];
    prop_oneof![
        Just(HashScheme::abi_deadline()),
        Just(HashScheme::abi_window()),
        (fields, prop_oneof![Just("|"), Just(":"), Just("\u{1f}")])
            .prop_map(|(fields, delim)| HashScheme::delimited(fields, delim)),
    ]
}
