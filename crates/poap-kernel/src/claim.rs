//! Pre-flight claim checks and claim submission.
//!
//! The gate reads claim state before a mint so a doomed transaction is
//! never sent. It is an optimization, not a guard: the ledger alone decides
//! whether a claim succeeds, and two concurrent submissions for the same
//! attendee are resolved there.

use std::sync::Arc;

use poap_kernel_core::{Address, LectureKey, LectureRef, TokenId, TxHash, WindowPhase};
use poap_kernel_ledger::{ClaimState, LedgerReader, LedgerWriter, RejectReason};
use tracing::{info, warn};

use crate::error::{KernelError, Result};
use crate::now_secs;
use crate::resolver::IdentityResolver;

/// Whether an attendee can claim a lecture right now.
///
/// Precedence: `LectureNotFound` > `AlreadyClaimed` > `NotYetOpen` >
/// `Expired` > `Claimable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    Claimable,
    /// Token id of the prior claim, when the ledger exposes it.
    AlreadyClaimed(Option<TokenId>),
    /// Opens at this Unix time.
    NotYetOpen(u64),
    /// Closed at this Unix time.
    Expired(u64),
    LectureNotFound,
}

impl ClaimStatus {
    pub fn is_claimable(&self) -> bool {
        matches!(self, ClaimStatus::Claimable)
    }

    /// The rejection a submission would meet, if any.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            ClaimStatus::Claimable => None,
            ClaimStatus::AlreadyClaimed(_) => Some(RejectReason::AlreadyClaimed),
            ClaimStatus::NotYetOpen(_) => Some(RejectReason::NotYetOpen),
            ClaimStatus::Expired(_) => Some(RejectReason::Expired),
            ClaimStatus::LectureNotFound => Some(RejectReason::LectureNotFound),
        }
    }
}

/// Outcome of a submitted claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub lecture: LectureRef,
    pub attendee: Address,
    pub tx_hash: TxHash,
    pub token_id: Option<TokenId>,
    /// Whether a read after submission saw the claim.
    pub confirmed: bool,
}

/// Claim checks and submission against one ledger.
pub struct ClaimGate<R, W> {
    resolver: Arc<IdentityResolver<R>>,
    writer: Arc<W>,
}

impl<R: LedgerReader, W: LedgerWriter> ClaimGate<R, W> {
    pub fn new(resolver: Arc<IdentityResolver<R>>, writer: Arc<W>) -> Self {
        Self { resolver, writer }
    }

    /// Check claimability at the current wall-clock time.
    pub async fn check_claimable(&self, key: &LectureKey, attendee: &Address) -> Result<ClaimStatus> {
        self.check_claimable_at(key, attendee, now_secs()).await
    }

    /// Check claimability at `now` (Unix seconds).
    ///
    /// Read failures propagate as errors; they are never reported as
    /// `LectureNotFound`.
    pub async fn check_claimable_at(
        &self,
        key: &LectureKey,
        attendee: &Address,
        now: u64,
    ) -> Result<ClaimStatus> {
        let lecture = match self.resolver.resolve(key).await {
            Ok(lecture) => lecture,
            Err(KernelError::NotFound(_)) => return Ok(ClaimStatus::LectureNotFound),
            Err(e) => return Err(e),
        };
        self.status_of(&lecture, attendee, now).await
    }

    /// Claim status of an already resolved lecture.
    pub async fn status_of(
        &self,
        lecture: &LectureRef,
        attendee: &Address,
        now: u64,
    ) -> Result<ClaimStatus> {
        let ledger_key = self.resolver.ledger_key(lecture);
        let state = self
            .resolver
            .ledger()
            .claim_state(&ledger_key, attendee)
            .await?;
        if let ClaimState::Claimed { token_id } = state {
            return Ok(ClaimStatus::AlreadyClaimed(token_id));
        }

        let window = lecture.window();
        if lecture.active_flag == Some(false) {
            return Ok(ClaimStatus::Expired(window.end));
        }
        Ok(match window.phase(now) {
            WindowPhase::NotYetOpen => ClaimStatus::NotYetOpen(window.start),
            WindowPhase::Closed => ClaimStatus::Expired(window.end),
            WindowPhase::Open => ClaimStatus::Claimable,
        })
    }

    /// Submit a mint without a pre-flight check.
    ///
    /// The ledger enforces every rule itself; a refusal comes back as
    /// `LedgerRejected`. After submission the claim state is read again
    /// and reported in [`ClaimReceipt::confirmed`].
    pub async fn submit_claim(&self, key: &LectureKey, attendee: &Address) -> Result<ClaimReceipt> {
        let lecture = self.resolver.resolve(key).await?;
        self.submit_resolved(lecture, attendee).await
    }

    /// Check, then submit only if the lecture is claimable now.
    pub async fn claim(&self, key: &LectureKey, attendee: &Address) -> Result<ClaimReceipt> {
        self.claim_at(key, attendee, now_secs()).await
    }

    /// [`Self::claim`] with the pre-flight check evaluated at `now`.
    pub async fn claim_at(
        &self,
        key: &LectureKey,
        attendee: &Address,
        now: u64,
    ) -> Result<ClaimReceipt> {
        let lecture = match self.resolver.resolve(key).await {
            Ok(lecture) => lecture,
            Err(KernelError::NotFound(_)) => {
                return Err(KernelError::LedgerRejected(RejectReason::LectureNotFound))
            }
            Err(e) => return Err(e),
        };
        let status = self.status_of(&lecture, attendee, now).await?;
        if let Some(reason) = status.reject_reason() {
            return Err(KernelError::LedgerRejected(reason));
        }
        self.submit_resolved(lecture, attendee).await
    }

    async fn submit_resolved(&self, lecture: LectureRef, attendee: &Address) -> Result<ClaimReceipt> {
        let ledger_key = self.resolver.ledger_key(&lecture);
        let mint = self.writer.mint_claim(&ledger_key, attendee).await?;
        info!(
            index = lecture.index,
            hash = %lecture.hash,
            attendee = %attendee,
            tx = %mint.tx_hash,
            "claim submitted"
        );

        let confirmed = match self
            .resolver
            .ledger()
            .claim_state(&ledger_key, attendee)
            .await
        {
            Ok(state) => state.is_claimed(),
            Err(e) => {
                warn!(hash = %lecture.hash, attendee = %attendee, error = %e, "could not confirm claim");
                false
            }
        };
        if !confirmed {
            warn!(hash = %lecture.hash, attendee = %attendee, "claim not yet visible on ledger");
        }

        Ok(ClaimReceipt {
            lecture,
            attendee: *attendee,
            tx_hash: mint.tx_hash,
            token_id: mint.token_id,
            confirmed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use poap_kernel_core::{HashDeriver, LectureHash, LectureParams};
    use poap_kernel_ledger::{LedgerSchema, MemoryLedger};

    fn attendee() -> Address {
        Address::from_bytes([0xaa; 20])
    }

    async fn gate(schema: LedgerSchema) -> (Arc<MemoryLedger>, ClaimGate<MemoryLedger, MemoryLedger>) {
        let ledger = Arc::new(MemoryLedger::new(schema));
        ledger
            .create_lecture(&LectureParams::with_window("Talk", 100, 200, "ipfs://talk"))
            .await
            .unwrap();
        let resolver = Arc::new(IdentityResolver::new(
            ledger.clone(),
            HashDeriver::new(schema.default_hash_scheme()),
            ResolverConfig::default(),
        ));
        (ledger.clone(), ClaimGate::new(resolver, ledger))
    }

    #[tokio::test]
    async fn test_window_phases() {
        let (_, gate) = gate(LedgerSchema::Indexed).await;
        let key = LectureKey::Index(0);
        assert_eq!(
            gate.check_claimable_at(&key, &attendee(), 99).await.unwrap(),
            ClaimStatus::NotYetOpen(100)
        );
        assert_eq!(
            gate.check_claimable_at(&key, &attendee(), 100).await.unwrap(),
            ClaimStatus::Claimable
        );
        assert_eq!(
            gate.check_claimable_at(&key, &attendee(), 200).await.unwrap(),
            ClaimStatus::Expired(200)
        );
    }

    #[tokio::test]
    async fn test_already_claimed_beats_expired() {
        let (ledger, gate) = gate(LedgerSchema::Indexed).await;
        let key = LectureKey::Index(0);
        ledger.set_time(150).await;
        gate.claim_at(&key, &attendee(), 150).await.unwrap();
        assert_eq!(
            gate.check_claimable_at(&key, &attendee(), 250).await.unwrap(),
            ClaimStatus::AlreadyClaimed(None)
        );
    }

    #[tokio::test]
    async fn test_missing_lecture() {
        let (_, gate) = gate(LedgerSchema::Indexed).await;
        let key = LectureKey::Hash(LectureHash::from_bytes([1; 32]));
        assert_eq!(
            gate.check_claimable_at(&key, &attendee(), 150).await.unwrap(),
            ClaimStatus::LectureNotFound
        );
        assert!(matches!(
            gate.claim_at(&key, &attendee(), 150).await,
            Err(KernelError::LedgerRejected(RejectReason::LectureNotFound))
        ));
    }

    #[tokio::test]
    async fn test_read_failure_is_transient_not_missing() {
        let (ledger, gate) = gate(LedgerSchema::Indexed).await;
        ledger.fail_next_calls(1).await;
        let err = gate
            .check_claimable_at(&LectureKey::Index(0), &attendee(), 150)
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_claim_refuses_with_specific_reason() {
        let (_, gate) = gate(LedgerSchema::Indexed).await;
        let err = gate
            .claim_at(&LectureKey::Index(0), &attendee(), 50)
            .await
            .unwrap_err();
        assert_eq!(err.reject_reason(), Some(&RejectReason::NotYetOpen));
    }

    #[tokio::test]
    async fn test_submit_confirms_and_ledger_rejects_repeat() {
        let (ledger, gate) = gate(LedgerSchema::Indexed).await;
        ledger.set_time(150).await;
        let receipt = gate
            .submit_claim(&LectureKey::Index(0), &attendee())
            .await
            .unwrap();
        assert!(receipt.confirmed);
        assert_eq!(receipt.token_id, Some(TokenId(1)));

        let err = gate
            .submit_claim(&LectureKey::Index(0), &attendee())
            .await
            .unwrap_err();
        assert_eq!(err.reject_reason(), Some(&RejectReason::AlreadyClaimed));
    }

    #[tokio::test]
    async fn test_sequential_token_id_and_inactive_flag() {
        let (ledger, gate) = gate(LedgerSchema::Sequential).await;
        let key = LectureKey::Index(0);
        ledger.set_time(150).await;

        ledger.set_active(1, false).await.unwrap();
        assert_eq!(
            gate.check_claimable_at(&key, &attendee(), 150).await.unwrap(),
            ClaimStatus::Expired(200)
        );

        ledger.set_active(1, true).await.unwrap();
        let receipt = gate.claim_at(&key, &attendee(), 150).await.unwrap();
        assert_eq!(receipt.token_id, Some(TokenId(1)));
        assert_eq!(
            gate.check_claimable_at(&key, &attendee(), 150).await.unwrap(),
            ClaimStatus::AlreadyClaimed(Some(TokenId(1)))
        );
    }
}
