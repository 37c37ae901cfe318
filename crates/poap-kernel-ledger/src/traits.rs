//! Ledger traits: the abstract interface to the lecture contract.
//!
//! Three contract generations exist in the field. Each exposes a different
//! read surface, so responses come back as a schema-tagged [`LedgerLecture`]
//! and the kernel normalizes them into one canonical record.

use async_trait::async_trait;
use poap_kernel_core::{
    Address, HashScheme, LectureHash, LectureParams, TokenId, TxHash,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Contract generation behind a ledger endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSchema {
    /// 1-based numeric ids, a single deadline and an administrative
    /// `active` flag. Claims are keyed by id.
    Sequential,
    /// Hash-keyed lectures with a single deadline. Enumeration goes through
    /// a `lectureCounter(i) -> hash` lookup table.
    HashPrimary,
    /// Hash-keyed lectures with a `[start, end)` window, enumerable by
    /// 0-based index. Canonical.
    Indexed,
}

impl LedgerSchema {
    /// Hash scheme the contract uses at creation time.
    pub fn default_hash_scheme(&self) -> HashScheme {
        match self {
            LedgerSchema::Sequential | LedgerSchema::HashPrimary => HashScheme::abi_deadline(),
            LedgerSchema::Indexed => HashScheme::abi_window(),
        }
    }

    /// Whether the contract stores a hash for each lecture.
    pub fn stores_hash(&self) -> bool {
        !matches!(self, LedgerSchema::Sequential)
    }

    /// Whether lectures carry an explicit start time.
    pub fn has_window(&self) -> bool {
        matches!(self, LedgerSchema::Indexed)
    }

    /// Ledger-native id for a 0-based creation index.
    pub fn native_id(&self, index: u64) -> u64 {
        match self {
            LedgerSchema::Sequential => index + 1,
            _ => index,
        }
    }
}

impl Default for LedgerSchema {
    fn default() -> Self {
        LedgerSchema::Indexed
    }
}

/// How the ledger itself addresses a lecture in claim and mint calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerKey {
    /// Ledger-native numeric id (1-based under [`LedgerSchema::Sequential`]).
    Id(u64),
    Hash(LectureHash),
}

/// A lecture as one contract generation returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerLecture {
    Sequential {
        id: u64,
        name: String,
        deadline: u64,
        active: bool,
        token_uri: String,
    },
    HashPrimary {
        hash: LectureHash,
        name: String,
        deadline: u64,
        token_uri: String,
    },
    Indexed {
        index: u64,
        hash: LectureHash,
        name: String,
        start_time: u64,
        end_time: u64,
        token_uri: String,
    },
}

impl LedgerLecture {
    pub fn schema(&self) -> LedgerSchema {
        match self {
            LedgerLecture::Sequential { .. } => LedgerSchema::Sequential,
            LedgerLecture::HashPrimary { .. } => LedgerSchema::HashPrimary,
            LedgerLecture::Indexed { .. } => LedgerSchema::Indexed,
        }
    }

    /// Creation parameters as stored.
    pub fn params(&self) -> LectureParams {
        match self {
            LedgerLecture::Sequential {
                name,
                deadline,
                token_uri,
                ..
            }
            | LedgerLecture::HashPrimary {
                name,
                deadline,
                token_uri,
                ..
            } => LectureParams::with_deadline(name.clone(), *deadline, token_uri.clone()),
            LedgerLecture::Indexed {
                name,
                start_time,
                end_time,
                token_uri,
                ..
            } => LectureParams::with_window(name.clone(), *start_time, *end_time, token_uri.clone()),
        }
    }

    /// Hash recorded by the ledger, if the schema stores one.
    pub fn stored_hash(&self) -> Option<LectureHash> {
        match self {
            LedgerLecture::Sequential { .. } => None,
            LedgerLecture::HashPrimary { hash, .. } | LedgerLecture::Indexed { hash, .. } => {
                Some(*hash)
            }
        }
    }

    /// 0-based creation index, if the response carries one.
    pub fn stored_index(&self) -> Option<u64> {
        match self {
            LedgerLecture::Sequential { id, .. } => id.checked_sub(1),
            LedgerLecture::HashPrimary { .. } => None,
            LedgerLecture::Indexed { index, .. } => Some(*index),
        }
    }

    /// Administrative override, where the schema has one.
    pub fn active_flag(&self) -> Option<bool> {
        match self {
            LedgerLecture::Sequential { active, .. } => Some(*active),
            _ => None,
        }
    }
}

/// Whether an attendee holds the token for a lecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    Unclaimed,
    /// `token_id` is known only when the ledger exposes it.
    Claimed { token_id: Option<TokenId> },
}

impl ClaimState {
    pub fn is_claimed(&self) -> bool {
        matches!(self, ClaimState::Claimed { .. })
    }
}

/// Receipt for an accepted lecture creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationReceipt {
    pub tx_hash: TxHash,
    /// Key carried by the creation event, when one was emitted.
    pub created: Option<LedgerKey>,
}

/// Receipt for an accepted mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub tx_hash: TxHash,
    pub token_id: Option<TokenId>,
}

/// Read access to the lecture contract.
///
/// Implementations must be thread-safe (Send + Sync). Missing records are
/// `Ok(None)`; errors are reserved for failed calls.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Contract generation behind this reader.
    fn schema(&self) -> LedgerSchema;

    /// Number of lectures ever created.
    async fn lecture_count(&self) -> Result<u64>;

    /// Fetch by position.
    ///
    /// The position is the ledger-native id: 1-based under
    /// [`LedgerSchema::Sequential`], 0-based under [`LedgerSchema::Indexed`].
    /// Unsupported under [`LedgerSchema::HashPrimary`].
    async fn lecture_at(&self, position: u64) -> Result<Option<LedgerLecture>>;

    /// Hash lookup table (`lectureCounter`). Only under
    /// [`LedgerSchema::HashPrimary`].
    async fn hash_at(&self, index: u64) -> Result<Option<LectureHash>>;

    /// Fetch by stored hash. Unsupported under [`LedgerSchema::Sequential`].
    async fn lecture_by_hash(&self, hash: &LectureHash) -> Result<Option<LedgerLecture>>;

    /// Claim state of `attendee` for the lecture at `key`.
    async fn claim_state(&self, key: &LedgerKey, attendee: &Address) -> Result<ClaimState>;
}

/// Write access to the lecture contract.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Submit a lecture creation.
    async fn create_lecture(&self, params: &LectureParams) -> Result<CreationReceipt>;

    /// Submit a mint of the attendance token for `attendee`.
    async fn mint_claim(&self, key: &LedgerKey, attendee: &Address) -> Result<MintReceipt>;
}
