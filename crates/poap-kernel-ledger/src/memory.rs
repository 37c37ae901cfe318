//! In-memory ledger for testing and local development.
//!
//! Behaves like one deployed contract generation: it derives hashes at
//! creation, enforces claim windows and single claims at mint, and answers
//! reads in that generation's shape. Failures can be injected per index or
//! for the next few calls.

use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use poap_kernel_core::{
    keccak256, Address, HashDeriver, HashScheme, LectureHash, LectureParams, TokenId, TxHash,
    WindowPhase,
};
use tokio::sync::RwLock;

use crate::error::{LedgerError, RejectReason, Result};
use crate::traits::{
    ClaimState, CreationReceipt, LedgerKey, LedgerLecture, LedgerReader, LedgerSchema,
    LedgerWriter, MintReceipt,
};

#[derive(Debug, Clone)]
struct StoredLecture {
    hash: LectureHash,
    params: LectureParams,
    active: bool,
}

#[derive(Debug, Default)]
struct LedgerState {
    lectures: Vec<StoredLecture>,
    by_hash: HashMap<LectureHash, u64>,
    claims: HashMap<(u64, Address), TokenId>,
    last_token: u64,
    tx_nonce: u64,
    paused: bool,
    clock: Option<u64>,
    /// 0-based creation indices whose reads fail.
    failing: HashSet<u64>,
    fail_next: u32,
    calls: u64,
}

impl LedgerState {
    fn now(&self) -> u64 {
        self.clock.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        })
    }

    /// Count the call and apply pending injected failures.
    fn begin_call(&mut self, operation: &str) -> Result<()> {
        self.calls += 1;
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(LedgerError::Transport(format!(
                "injected failure during {}",
                operation
            )));
        }
        Ok(())
    }

    fn check_index(&self, index: u64) -> Result<()> {
        if self.failing.contains(&index) {
            return Err(LedgerError::Transport(format!(
                "injected failure reading index {}",
                index
            )));
        }
        Ok(())
    }

    fn next_tx(&mut self) -> TxHash {
        self.tx_nonce += 1;
        let mut preimage = b"memory-ledger-tx".to_vec();
        preimage.extend_from_slice(&self.tx_nonce.to_be_bytes());
        TxHash::from_bytes(keccak256(&preimage))
    }
}

/// In-memory lecture contract.
pub struct MemoryLedger {
    schema: LedgerSchema,
    deriver: HashDeriver,
    state: RwLock<LedgerState>,
}

impl MemoryLedger {
    /// A ledger of the given generation, hashing the way that generation
    /// does.
    pub fn new(schema: LedgerSchema) -> Self {
        Self::with_hash_scheme(schema, schema.default_hash_scheme())
    }

    /// A ledger that hashes under a custom scheme.
    pub fn with_hash_scheme(schema: LedgerSchema, scheme: HashScheme) -> Self {
        Self {
            schema,
            deriver: HashDeriver::new(scheme),
            state: RwLock::new(LedgerState::default()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Test Controls
    // ─────────────────────────────────────────────────────────────────────────

    /// Pin the ledger's block time. Unpinned, wall-clock time is used.
    pub async fn set_time(&self, now: u64) {
        self.state.write().await.clock = Some(now);
    }

    pub async fn pause(&self) {
        self.state.write().await.paused = true;
    }

    pub async fn unpause(&self) {
        self.state.write().await.paused = false;
    }

    /// Flip the administrative flag of a lecture by 1-based id.
    pub async fn set_active(&self, id: u64, active: bool) -> Result<()> {
        if self.schema != LedgerSchema::Sequential {
            return Err(LedgerError::Unsupported {
                schema: self.schema,
                operation: "set_active",
            });
        }
        let mut state = self.state.write().await;
        let lecture = id
            .checked_sub(1)
            .and_then(|i| state.lectures.get_mut(i as usize))
            .ok_or(LedgerError::Rejected(RejectReason::LectureNotFound))?;
        lecture.active = active;
        Ok(())
    }

    /// Make every read of the lecture at this 0-based index fail.
    pub async fn fail_reads_at(&self, index: u64) {
        self.state.write().await.failing.insert(index);
    }

    /// Make the next `n` calls fail with a transport error.
    pub async fn fail_next_calls(&self, n: u32) {
        self.state.write().await.fail_next = n;
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.failing.clear();
        state.fail_next = 0;
    }

    /// Total calls served, failed ones included.
    pub async fn call_count(&self) -> u64 {
        self.state.read().await.calls
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn to_ledger_lecture(&self, index: u64, stored: &StoredLecture) -> LedgerLecture {
        let params = &stored.params;
        match self.schema {
            LedgerSchema::Sequential => LedgerLecture::Sequential {
                id: index + 1,
                name: params.name.clone(),
                deadline: params.end_time,
                active: stored.active,
                token_uri: params.token_uri.clone(),
            },
            LedgerSchema::HashPrimary => LedgerLecture::HashPrimary {
                hash: stored.hash,
                name: params.name.clone(),
                deadline: params.end_time,
                token_uri: params.token_uri.clone(),
            },
            LedgerSchema::Indexed => LedgerLecture::Indexed {
                index,
                hash: stored.hash,
                name: params.name.clone(),
                start_time: params.start_time.unwrap_or(0),
                end_time: params.end_time,
                token_uri: params.token_uri.clone(),
            },
        }
    }

    fn unsupported(&self, operation: &'static str) -> LedgerError {
        LedgerError::Unsupported {
            schema: self.schema,
            operation,
        }
    }

    /// 0-based index addressed by a ledger key, if it exists.
    fn locate(&self, state: &LedgerState, key: &LedgerKey) -> Result<Option<u64>> {
        match (self.schema, key) {
            (LedgerSchema::Sequential, LedgerKey::Id(id)) => Ok(id
                .checked_sub(1)
                .filter(|i| (*i as usize) < state.lectures.len())),
            (LedgerSchema::Sequential, LedgerKey::Hash(_)) => Err(self.unsupported("hash key")),
            (_, LedgerKey::Hash(hash)) => Ok(state.by_hash.get(hash).copied()),
            (_, LedgerKey::Id(_)) => Err(self.unsupported("numeric key")),
        }
    }
}

#[async_trait]
impl LedgerReader for MemoryLedger {
    fn schema(&self) -> LedgerSchema {
        self.schema
    }

    async fn lecture_count(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        state.begin_call("lecture_count")?;
        Ok(state.lectures.len() as u64)
    }

    async fn lecture_at(&self, position: u64) -> Result<Option<LedgerLecture>> {
        let index = match self.schema {
            LedgerSchema::Sequential => match position.checked_sub(1) {
                Some(i) => i,
                None => return Ok(None),
            },
            LedgerSchema::Indexed => position,
            LedgerSchema::HashPrimary => return Err(self.unsupported("lecture_at")),
        };
        let mut state = self.state.write().await;
        state.begin_call("lecture_at")?;
        state.check_index(index)?;
        Ok(state
            .lectures
            .get(index as usize)
            .map(|stored| self.to_ledger_lecture(index, stored)))
    }

    async fn hash_at(&self, index: u64) -> Result<Option<LectureHash>> {
        if self.schema != LedgerSchema::HashPrimary {
            return Err(self.unsupported("hash_at"));
        }
        let mut state = self.state.write().await;
        state.begin_call("hash_at")?;
        state.check_index(index)?;
        Ok(state.lectures.get(index as usize).map(|l| l.hash))
    }

    async fn lecture_by_hash(&self, hash: &LectureHash) -> Result<Option<LedgerLecture>> {
        if !self.schema.stores_hash() {
            return Err(self.unsupported("lecture_by_hash"));
        }
        let mut state = self.state.write().await;
        state.begin_call("lecture_by_hash")?;
        let Some(index) = state.by_hash.get(hash).copied() else {
            return Ok(None);
        };
        state.check_index(index)?;
        Ok(state
            .lectures
            .get(index as usize)
            .map(|stored| self.to_ledger_lecture(index, stored)))
    }

    async fn claim_state(&self, key: &LedgerKey, attendee: &Address) -> Result<ClaimState> {
        let mut state = self.state.write().await;
        state.begin_call("claim_state")?;
        let Some(index) = self.locate(&state, key)? else {
            return Ok(ClaimState::Unclaimed);
        };
        Ok(match state.claims.get(&(index, *attendee)) {
            Some(token) if self.schema == LedgerSchema::Sequential => ClaimState::Claimed {
                token_id: Some(*token),
            },
            Some(_) => ClaimState::Claimed { token_id: None },
            None => ClaimState::Unclaimed,
        })
    }
}

#[async_trait]
impl LedgerWriter for MemoryLedger {
    async fn create_lecture(&self, params: &LectureParams) -> Result<CreationReceipt> {
        let stored_params = if self.schema.has_window() {
            if params.start_time.is_none() {
                return Err(LedgerError::Rejected(RejectReason::Other(
                    "start time required".into(),
                )));
            }
            params.clone()
        } else {
            LectureParams::with_deadline(
                params.name.clone(),
                params.end_time,
                params.token_uri.clone(),
            )
        };
        let hash = self.deriver.derive(&stored_params)?;

        let mut state = self.state.write().await;
        state.begin_call("create_lecture")?;
        if state.paused {
            return Err(LedgerError::Rejected(RejectReason::Paused));
        }
        if self.schema.stores_hash() && state.by_hash.contains_key(&hash) {
            return Err(LedgerError::Rejected(RejectReason::Other(
                "Lecture already exists".into(),
            )));
        }

        let index = state.lectures.len() as u64;
        state.lectures.push(StoredLecture {
            hash,
            params: stored_params,
            active: true,
        });
        if self.schema.stores_hash() {
            state.by_hash.insert(hash, index);
        }

        let created = match self.schema {
            LedgerSchema::Sequential => LedgerKey::Id(index + 1),
            _ => LedgerKey::Hash(hash),
        };
        Ok(CreationReceipt {
            tx_hash: state.next_tx(),
            created: Some(created),
        })
    }

    async fn mint_claim(&self, key: &LedgerKey, attendee: &Address) -> Result<MintReceipt> {
        let mut state = self.state.write().await;
        state.begin_call("mint_claim")?;
        if state.paused {
            return Err(LedgerError::Rejected(RejectReason::Paused));
        }
        let index = self
            .locate(&state, key)?
            .ok_or(LedgerError::Rejected(RejectReason::LectureNotFound))?;
        let lecture = state.lectures[index as usize].clone();

        if !lecture.active {
            return Err(LedgerError::Rejected(RejectReason::Inactive));
        }
        if state.claims.contains_key(&(index, *attendee)) {
            return Err(LedgerError::Rejected(RejectReason::AlreadyClaimed));
        }
        match lecture.params.window().phase(state.now()) {
            WindowPhase::NotYetOpen => return Err(LedgerError::Rejected(RejectReason::NotYetOpen)),
            WindowPhase::Closed => return Err(LedgerError::Rejected(RejectReason::Expired)),
            WindowPhase::Open => {}
        }

        let token_id = match self.schema {
            LedgerSchema::Sequential => TokenId(index + 1),
            _ => {
                state.last_token += 1;
                TokenId(state.last_token)
            }
        };
        state.claims.insert((index, *attendee), token_id);
        Ok(MintReceipt {
            tx_hash: state.next_tx(),
            token_id: Some(token_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attendee() -> Address {
        Address::from_bytes([0x11; 20])
    }

    fn window_params() -> LectureParams {
        LectureParams::with_window("Intro to Systems", 100, 200, "ipfs://Qm123")
    }

    #[tokio::test]
    async fn test_indexed_create_and_read() {
        let ledger = MemoryLedger::new(LedgerSchema::Indexed);
        let receipt = ledger.create_lecture(&window_params()).await.unwrap();
        let expected = HashDeriver::new(HashScheme::abi_window())
            .derive(&window_params())
            .unwrap();
        assert_eq!(receipt.created, Some(LedgerKey::Hash(expected)));

        assert_eq!(ledger.lecture_count().await.unwrap(), 1);
        let by_index = ledger.lecture_at(0).await.unwrap().unwrap();
        let by_hash = ledger.lecture_by_hash(&expected).await.unwrap().unwrap();
        assert_eq!(by_index, by_hash);
        assert!(ledger.lecture_at(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sequential_ids_are_one_based() {
        let ledger = MemoryLedger::new(LedgerSchema::Sequential);
        let receipt = ledger.create_lecture(&window_params()).await.unwrap();
        assert_eq!(receipt.created, Some(LedgerKey::Id(1)));
        assert!(ledger.lecture_at(0).await.unwrap().is_none());
        match ledger.lecture_at(1).await.unwrap().unwrap() {
            LedgerLecture::Sequential { id, deadline, active, .. } => {
                assert_eq!(id, 1);
                assert_eq!(deadline, 200);
                assert!(active);
            }
            other => panic!("unexpected shape {:?}", other),
        }
        assert!(matches!(
            ledger.lecture_by_hash(&LectureHash::ZERO).await,
            Err(LedgerError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_hash_primary_lookup_table() {
        let ledger = MemoryLedger::new(LedgerSchema::HashPrimary);
        ledger
            .create_lecture(&LectureParams::with_deadline("A", 200, "ipfs://a"))
            .await
            .unwrap();
        let hash = ledger.hash_at(0).await.unwrap().unwrap();
        assert!(ledger.lecture_by_hash(&hash).await.unwrap().is_some());
        assert!(ledger.hash_at(1).await.unwrap().is_none());
        assert!(matches!(
            ledger.lecture_at(0).await,
            Err(LedgerError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_mint_enforces_window_and_single_claim() {
        let ledger = MemoryLedger::new(LedgerSchema::Indexed);
        let receipt = ledger.create_lecture(&window_params()).await.unwrap();
        let key = receipt.created.unwrap();

        ledger.set_time(50).await;
        assert!(matches!(
            ledger.mint_claim(&key, &attendee()).await,
            Err(LedgerError::Rejected(RejectReason::NotYetOpen))
        ));

        ledger.set_time(150).await;
        let mint = ledger.mint_claim(&key, &attendee()).await.unwrap();
        assert_eq!(mint.token_id, Some(TokenId(1)));
        assert!(matches!(
            ledger.mint_claim(&key, &attendee()).await,
            Err(LedgerError::Rejected(RejectReason::AlreadyClaimed))
        ));
        assert!(ledger.claim_state(&key, &attendee()).await.unwrap().is_claimed());

        ledger.set_time(200).await;
        let other = Address::from_bytes([0x22; 20]);
        assert!(matches!(
            ledger.mint_claim(&key, &other).await,
            Err(LedgerError::Rejected(RejectReason::Expired))
        ));
    }

    #[tokio::test]
    async fn test_inactive_and_paused() {
        let ledger = MemoryLedger::new(LedgerSchema::Sequential);
        ledger.create_lecture(&window_params()).await.unwrap();
        ledger.set_time(150).await;

        ledger.set_active(1, false).await.unwrap();
        assert!(matches!(
            ledger.mint_claim(&LedgerKey::Id(1), &attendee()).await,
            Err(LedgerError::Rejected(RejectReason::Inactive))
        ));

        ledger.set_active(1, true).await.unwrap();
        ledger.pause().await;
        assert!(matches!(
            ledger.mint_claim(&LedgerKey::Id(1), &attendee()).await,
            Err(LedgerError::Rejected(RejectReason::Paused))
        ));

        ledger.unpause().await;
        let mint = ledger.mint_claim(&LedgerKey::Id(1), &attendee()).await.unwrap();
        assert_eq!(mint.token_id, Some(TokenId(1)));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let ledger = MemoryLedger::new(LedgerSchema::Indexed);
        for i in 0..3u64 {
            ledger
                .create_lecture(&LectureParams::with_window(
                    format!("L{}", i),
                    100,
                    200,
                    "ipfs://x",
                ))
                .await
                .unwrap();
        }
        ledger.fail_reads_at(1).await;
        assert!(ledger.lecture_at(0).await.is_ok());
        assert!(ledger.lecture_at(1).await.unwrap_err().is_transient());

        ledger.fail_next_calls(1).await;
        assert!(ledger.lecture_count().await.is_err());
        assert_eq!(ledger.lecture_count().await.unwrap(), 3);

        ledger.clear_failures().await;
        assert!(ledger.lecture_at(1).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_hash_rejected() {
        let ledger = MemoryLedger::new(LedgerSchema::Indexed);
        ledger.create_lecture(&window_params()).await.unwrap();
        assert!(matches!(
            ledger.create_lecture(&window_params()).await,
            Err(LedgerError::Rejected(RejectReason::Other(_)))
        ));
    }

    #[tokio::test]
    async fn test_indexed_requires_start() {
        let ledger = MemoryLedger::new(LedgerSchema::Indexed);
        let err = ledger
            .create_lecture(&LectureParams::with_deadline("A", 200, "ipfs://a"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
    }
}
