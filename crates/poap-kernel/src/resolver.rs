//! Identity resolution: sequential index ⇄ content hash.
//!
//! The resolver turns whatever reference a caller holds into a
//! [`LectureRef`] carrying both forms. How it gets there depends on the
//! configured [`LedgerSchema`]:
//!
//! | Schema        | By index                          | By hash                          |
//! |---------------|-----------------------------------|----------------------------------|
//! | `Sequential`  | `lecture_at(index + 1)`           | scan, comparing derived hashes   |
//! | `HashPrimary` | `hash_at(index)` then by hash     | by hash, index from table scan   |
//! | `Indexed`     | `lecture_at(index)`               | `lecture_by_hash(hash)`          |
//!
//! A failed lookup is never retried under a different schema.

use std::sync::Arc;

use poap_kernel_core::{
    parse_reference, HashDeriver, LectureHash, LectureKey, LectureRef,
};
use poap_kernel_ledger::{LedgerKey, LedgerLecture, LedgerReader, LedgerSchema};
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::{KernelError, Result};

/// Ordering of [`IdentityResolver::list_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOrder {
    /// Ledger creation order (ascending index).
    #[default]
    CreationOrder,
    /// Latest end time first; ties by ascending index.
    NewestFirst,
}

/// Maps lecture references to canonical [`LectureRef`]s.
pub struct IdentityResolver<R> {
    ledger: Arc<R>,
    deriver: HashDeriver,
    config: ResolverConfig,
}

impl<R: LedgerReader> IdentityResolver<R> {
    pub fn new(ledger: Arc<R>, deriver: HashDeriver, config: ResolverConfig) -> Self {
        Self {
            ledger,
            deriver,
            config,
        }
    }

    pub fn ledger(&self) -> &Arc<R> {
        &self.ledger
    }

    pub fn deriver(&self) -> &HashDeriver {
        &self.deriver
    }

    pub fn schema(&self) -> LedgerSchema {
        self.ledger.schema()
    }

    /// How the ledger addresses this lecture in claim and mint calls.
    pub fn ledger_key(&self, lecture: &LectureRef) -> LedgerKey {
        match self.schema() {
            LedgerSchema::Sequential => LedgerKey::Id(self.schema().native_id(lecture.index)),
            LedgerSchema::HashPrimary | LedgerSchema::Indexed => LedgerKey::Hash(lecture.hash),
        }
    }

    /// Number of lectures the ledger reports.
    pub async fn lecture_count(&self) -> Result<u64> {
        Ok(self.ledger.lecture_count().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve a 0-based index. Fails with `NotFound` outside
    /// `0..lecture_count()`.
    pub async fn resolve_by_index(&self, index: u64) -> Result<LectureRef> {
        let count = self.ledger.lecture_count().await?;
        if index >= count {
            return Err(KernelError::NotFound(LectureKey::Index(index)));
        }
        self.fetch_index(index).await
    }

    /// Resolve a lecture hash.
    pub async fn resolve_by_hash(&self, hash: &LectureHash) -> Result<LectureRef> {
        let not_found = || KernelError::NotFound(LectureKey::Hash(*hash));
        match self.schema() {
            LedgerSchema::Sequential => {
                let count = self.ledger.lecture_count().await?;
                for index in 0..count {
                    let lecture = self.fetch_index(index).await?;
                    if lecture.hash == *hash {
                        return Ok(lecture);
                    }
                }
                Err(not_found())
            }
            LedgerSchema::HashPrimary => {
                let record = self
                    .ledger
                    .lecture_by_hash(hash)
                    .await?
                    .ok_or_else(not_found)?;
                let index = self.table_index_of(hash).await?.ok_or_else(not_found)?;
                self.canonicalize(index, record)
            }
            LedgerSchema::Indexed => {
                let record = self
                    .ledger
                    .lecture_by_hash(hash)
                    .await?
                    .ok_or_else(not_found)?;
                let index = record.stored_index().ok_or_else(|| {
                    KernelError::Config("indexed ledger returned a record without an index".into())
                })?;
                self.canonicalize(index, record)
            }
        }
    }

    /// Resolve either form of key.
    pub async fn resolve(&self, key: &LectureKey) -> Result<LectureRef> {
        match key {
            LectureKey::Index(index) => self.resolve_by_index(*index).await,
            LectureKey::Hash(hash) => self.resolve_by_hash(hash).await,
        }
    }

    /// Parse a user-supplied reference (hash, index, scan or attend link)
    /// and resolve it. Malformed input fails before any ledger call.
    pub async fn resolve_reference(&self, input: &str) -> Result<LectureRef> {
        let key = parse_reference(input)?;
        self.resolve(&key).await
    }

    /// Every lecture the ledger reports, skipping any that fail to resolve.
    ///
    /// The result may be shorter than `lecture_count()`. Only a failure to
    /// read the count itself is an error.
    pub async fn list_all(&self, order: ListOrder) -> Result<Vec<LectureRef>> {
        let count = self.ledger.lecture_count().await?;
        let mut lectures = Vec::with_capacity(usize::try_from(count.min(1024)).unwrap_or(0));
        for index in 0..count {
            match self.fetch_index(index).await {
                Ok(lecture) => lectures.push(lecture),
                Err(e) => warn!(index, error = %e, "skipping lecture that failed to resolve"),
            }
        }
        debug!(count, listed = lectures.len(), ?order, "listed lectures");

        if order == ListOrder::NewestFirst {
            lectures.sort_by(|a, b| {
                b.params
                    .end_time
                    .cmp(&a.params.end_time)
                    .then(a.index.cmp(&b.index))
            });
        }
        Ok(lectures)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch an index known to be in range.
    async fn fetch_index(&self, index: u64) -> Result<LectureRef> {
        let not_found = || KernelError::NotFound(LectureKey::Index(index));
        let schema = self.schema();
        let record = match schema {
            LedgerSchema::Sequential | LedgerSchema::Indexed => self
                .ledger
                .lecture_at(schema.native_id(index))
                .await?
                .ok_or_else(not_found)?,
            LedgerSchema::HashPrimary => {
                let hash = self.ledger.hash_at(index).await?.ok_or_else(not_found)?;
                self.ledger
                    .lecture_by_hash(&hash)
                    .await?
                    .ok_or_else(not_found)?
            }
        };
        self.canonicalize(index, record)
    }

    /// Position of `hash` in the `lectureCounter` table.
    async fn table_index_of(&self, hash: &LectureHash) -> Result<Option<u64>> {
        let count = self.ledger.lecture_count().await?;
        for index in 0..count {
            if self.ledger.hash_at(index).await? == Some(*hash) {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Convert a schema-specific record to the canonical form.
    fn canonicalize(&self, index: u64, record: LedgerLecture) -> Result<LectureRef> {
        let params = record.params();
        let derive = || {
            self.deriver.derive(&params).map_err(|e| {
                KernelError::Config(format!(
                    "hash scheme {:?} does not fit {:?} records: {}",
                    self.deriver.scheme(),
                    record.schema(),
                    e
                ))
            })
        };

        let hash = match record.stored_hash() {
            Some(stored) => {
                if self.config.verify_hashes {
                    let derived = derive()?;
                    if derived != stored {
                        warn!(index, ledger = %stored, derived = %derived, "lecture hash mismatch");
                        return Err(KernelError::IntegrityMismatch {
                            index: Some(index),
                            ledger: stored,
                            derived,
                        });
                    }
                }
                stored
            }
            None => derive()?,
        };

        Ok(LectureRef {
            index,
            hash,
            active_flag: record.active_flag(),
            params,
        })
    }
}
