//! Solidity ABI encoding for the handful of types the lecture contract uses.
//!
//! Layout (standard head/tail encoding of a tuple):
//! - Every value occupies one 32-byte head slot.
//! - Static values (`uint256`, `bytes32`, `address`, `bool`) are written
//!   in place, big-endian, left-padded with zeros (`bytes32` is already
//!   32 bytes wide).
//! - Dynamic values (`string`) write a byte offset into the head; the tail
//!   holds the length word followed by the UTF-8 bytes right-padded to a
//!   multiple of 32.
//!
//! The encoding must match the ledger bit for bit: lecture hashes are
//! computed over it, and any width or ordering difference yields a
//! different hash.

use crate::crypto::selector;
use crate::error::{CoreError, Result};
use crate::types::{Address, LectureHash};

/// Width of one ABI word.
pub const WORD: usize = 32;

/// Selector of the standard `Error(string)` revert payload.
pub const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// A value to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// `uint256`. Values above `u128::MAX` are never produced by this crate.
    Uint(u128),
    /// `bytes32`.
    Bytes32([u8; 32]),
    /// `address`.
    Address(Address),
    /// `bool`.
    Bool(bool),
    /// `string`.
    String(&'a str),
}

impl Token<'_> {
    fn is_dynamic(&self) -> bool {
        matches!(self, Token::String(_))
    }
}

impl From<LectureHash> for Token<'_> {
    fn from(hash: LectureHash) -> Self {
        Token::Bytes32(hash.0)
    }
}

impl From<Address> for Token<'_> {
    fn from(addr: Address) -> Self {
        Token::Address(addr)
    }
}

/// Encode a tuple of tokens (`abi.encode(a, b, ...)`).
pub fn encode(tokens: &[Token<'_>]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            push_uint(&mut head, (head_len + tail.len()) as u128);
            encode_tail(&mut tail, token);
        } else {
            encode_static(&mut head, token);
        }
    }

    head.extend_from_slice(&tail);
    head
}

/// Encode a contract call: 4-byte selector followed by the encoded arguments.
pub fn encode_call(signature: &str, args: &[Token<'_>]) -> Vec<u8> {
    let mut buf = selector(signature).to_vec();
    buf.extend_from_slice(&encode(args));
    buf
}

fn push_uint(buf: &mut Vec<u8>, n: u128) {
    buf.extend_from_slice(&[0u8; 16]);
    buf.extend_from_slice(&n.to_be_bytes());
}

fn encode_static(buf: &mut Vec<u8>, token: &Token<'_>) {
    match token {
        Token::Uint(n) => push_uint(buf, *n),
        Token::Bytes32(b) => buf.extend_from_slice(b),
        Token::Address(a) => {
            buf.extend_from_slice(&[0u8; 12]);
            buf.extend_from_slice(a.as_bytes());
        }
        Token::Bool(b) => push_uint(buf, u128::from(*b)),
        Token::String(_) => unreachable!("dynamic token in static position"),
    }
}

fn encode_tail(buf: &mut Vec<u8>, token: &Token<'_>) {
    if let Token::String(s) = token {
        let bytes = s.as_bytes();
        push_uint(buf, bytes.len() as u128);
        buf.extend_from_slice(bytes);
        let rem = bytes.len() % WORD;
        if rem != 0 {
            buf.resize(buf.len() + (WORD - rem), 0);
        }
    }
}

/// Bounds-checked reader over ABI-encoded return data.
///
/// Slots are head positions (0-based). Dynamic values are followed through
/// their offsets relative to the start of `data`.
#[derive(Debug, Clone, Copy)]
pub struct AbiReader<'a> {
    data: &'a [u8],
}

impl<'a> AbiReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Number of whole words available.
    pub fn words(&self) -> usize {
        self.data.len() / WORD
    }

    fn word_at_offset(&self, offset: usize) -> Result<&'a [u8]> {
        let end = offset
            .checked_add(WORD)
            .ok_or_else(|| CoreError::AbiDecode("offset overflow".into()))?;
        self.data.get(offset..end).ok_or_else(|| {
            CoreError::AbiDecode(format!(
                "word at byte {} out of bounds ({} bytes)",
                offset,
                self.data.len()
            ))
        })
    }

    /// The raw word in head slot `slot`.
    pub fn word(&self, slot: usize) -> Result<&'a [u8]> {
        self.word_at_offset(slot * WORD)
    }

    /// A `uint256` that must fit in a `u64`.
    pub fn u64_at(&self, slot: usize) -> Result<u64> {
        word_to_u64(self.word(slot)?)
    }

    pub fn bool_at(&self, slot: usize) -> Result<bool> {
        match self.u64_at(slot)? {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(CoreError::AbiDecode(format!("invalid bool value {}", n))),
        }
    }

    pub fn bytes32_at(&self, slot: usize) -> Result<[u8; 32]> {
        let mut arr = [0u8; 32];
        arr.copy_from_slice(self.word(slot)?);
        Ok(arr)
    }

    pub fn hash_at(&self, slot: usize) -> Result<LectureHash> {
        self.bytes32_at(slot).map(LectureHash)
    }

    pub fn address_at(&self, slot: usize) -> Result<Address> {
        let word = self.word(slot)?;
        if word[..12].iter().any(|&b| b != 0) {
            return Err(CoreError::AbiDecode("dirty address padding".into()));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&word[12..]);
        Ok(Address(arr))
    }

    /// A `string` whose offset is stored in head slot `slot`.
    pub fn string_at(&self, slot: usize) -> Result<String> {
        let offset = usize::try_from(self.u64_at(slot)?)
            .map_err(|_| CoreError::AbiDecode("string offset too large".into()))?;
        let len = usize::try_from(word_to_u64(self.word_at_offset(offset)?)?)
            .map_err(|_| CoreError::AbiDecode("string length too large".into()))?;
        let start = offset + WORD;
        let bytes = start
            .checked_add(len)
            .and_then(|end| self.data.get(start..end))
            .ok_or_else(|| CoreError::AbiDecode("string body out of bounds".into()))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CoreError::AbiDecode(format!("string is not utf-8: {}", e)))
    }
}

fn word_to_u64(word: &[u8]) -> Result<u64> {
    if word[..24].iter().any(|&b| b != 0) {
        return Err(CoreError::AbiDecode("uint256 does not fit in u64".into()));
    }
    let mut arr = [0u8; 8];
    arr.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(arr))
}

/// A decoded revert payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revert {
    /// `require(cond, "message")` / `revert("message")`.
    Message(String),
    /// A custom error; only the selector is interpreted.
    Custom([u8; 4]),
    /// A bare `revert()` with no data.
    Empty,
}

/// Decode revert data returned by a failed call.
pub fn decode_revert(data: &[u8]) -> Result<Revert> {
    if data.is_empty() {
        return Ok(Revert::Empty);
    }
    if data.len() < 4 {
        return Err(CoreError::AbiDecode("revert data shorter than a selector".into()));
    }
    let mut sel = [0u8; 4];
    sel.copy_from_slice(&data[..4]);
    if sel == ERROR_STRING_SELECTOR {
        let message = AbiReader::new(&data[4..]).string_at(0)?;
        return Ok(Revert::Message(message));
    }
    Ok(Revert::Custom(sel))
}
