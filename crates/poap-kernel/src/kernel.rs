//! The Kernel: one handle over resolution, claims, creation, metadata and
//! admin sessions.

use std::sync::Arc;

use poap_kernel_core::{attend_url, scan_url, HashDeriver, LectureHash, LectureKey, LectureRef};
use poap_kernel_ledger::{LedgerReader, LedgerWriter, MemoryLedger};
use poap_kernel_metadata::{FetchOptions, MetadataNormalizer, TokenMetadata};
use poap_kernel_store::{open_session_store, Session, SessionStore};
use tracing::{debug, info};

use crate::claim::ClaimGate;
use crate::config::KernelConfig;
use crate::error::{KernelError, Result};
use crate::now_secs;
use crate::registrar::LectureRegistrar;
use crate::resolver::{IdentityResolver, ListOrder};

/// The main Kernel struct.
///
/// Owns the components wired for a single deployment:
/// - [`IdentityResolver`] for index ⇄ hash resolution
/// - [`ClaimGate`] for claim checks and submission
/// - [`LectureRegistrar`] for lecture creation
/// - [`MetadataNormalizer`] for token metadata
/// - a [`SessionStore`] for admin sessions
pub struct PoapKernel<R, W> {
    config: KernelConfig,
    resolver: Arc<IdentityResolver<R>>,
    claims: ClaimGate<R, W>,
    registrar: LectureRegistrar<R, W>,
    metadata: MetadataNormalizer,
    sessions: Arc<dyn SessionStore>,
}

impl<R: LedgerReader, W: LedgerWriter> PoapKernel<R, W> {
    /// Wire a kernel over the given ledger handles.
    ///
    /// Fails if the configuration is inconsistent or names a different
    /// schema than the reader serves.
    pub fn new(config: KernelConfig, reader: Arc<R>, writer: Arc<W>) -> Result<Self> {
        config.validate()?;
        if reader.schema() != config.schema {
            return Err(KernelError::Config(format!(
                "configured for {:?} but ledger serves {:?}",
                config.schema,
                reader.schema()
            )));
        }

        let scheme = config.effective_hash_scheme();
        debug!(schema = ?config.schema, ?scheme, "wiring kernel");
        let resolver = Arc::new(IdentityResolver::new(
            reader,
            HashDeriver::new(scheme),
            config.resolver.clone(),
        ));
        let claims = ClaimGate::new(resolver.clone(), writer.clone());
        let registrar = LectureRegistrar::new(resolver.clone(), writer);
        let metadata = MetadataNormalizer::new(config.metadata.clone())?;
        let sessions = open_session_store(&config.session)?;

        Ok(Self {
            config,
            resolver,
            claims,
            registrar,
            metadata,
            sessions,
        })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn resolver(&self) -> &IdentityResolver<R> {
        &self.resolver
    }

    pub fn claims(&self) -> &ClaimGate<R, W> {
        &self.claims
    }

    pub fn registrar(&self) -> &LectureRegistrar<R, W> {
        &self.registrar
    }

    pub fn metadata(&self) -> &MetadataNormalizer {
        &self.metadata
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metadata
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve each key and fetch its token metadata.
    ///
    /// Resolution errors propagate. Fetch failures become placeholders.
    pub async fn lecture_metadata(
        &self,
        keys: &[LectureKey],
        options: FetchOptions,
    ) -> Result<Vec<(LectureHash, TokenMetadata)>> {
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            let lecture = self.resolver.resolve(key).await?;
            items.push((lecture.hash, lecture.params.token_uri));
        }
        Ok(self.metadata.fetch_many(items, options).await)
    }

    /// Every listable lecture paired with its metadata.
    pub async fn list_with_metadata(
        &self,
        order: ListOrder,
        options: FetchOptions,
    ) -> Result<Vec<(LectureRef, TokenMetadata)>> {
        let lectures = self.resolver.list_all(order).await?;
        let items = lectures
            .iter()
            .enumerate()
            .map(|(slot, l)| (slot, l.params.token_uri.clone()))
            .collect();
        let fetched = self.metadata.fetch_many(items, options).await;
        Ok(lectures
            .into_iter()
            .zip(fetched)
            .map(|(lecture, (_, meta))| (lecture, meta))
            .collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Links
    // ─────────────────────────────────────────────────────────────────────────

    /// Attendee-facing claim link, keyed by hash.
    pub fn attend_url(&self, lecture: &LectureRef) -> String {
        attend_url(&self.config.base_url, &LectureKey::Hash(lecture.hash))
    }

    /// Link encoded in the lecture's scan code.
    pub fn scan_url(&self, lecture: &LectureRef) -> String {
        scan_url(&self.config.base_url, &lecture.hash)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue and store a session for `subject`.
    pub async fn open_session(&self, subject: &str) -> Result<Session> {
        let session = Session::issue(subject, self.config.session.ttl_secs, now_secs());
        self.sessions.set(&session).await?;
        info!(subject, expires_at = session.expires_at, "session opened");
        Ok(session)
    }

    /// Look up a live session by bearer token.
    pub async fn session(&self, token: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(token, now_secs()).await?)
    }

    /// End a session. Returns whether it existed.
    pub async fn close_session(&self, token: &str) -> Result<bool> {
        Ok(self.sessions.delete(token).await?)
    }

    /// Drop expired sessions. Returns how many were removed.
    pub async fn expire_sessions(&self) -> Result<usize> {
        Ok(self.sessions.expire(now_secs()).await?)
    }
}

impl PoapKernel<MemoryLedger, MemoryLedger> {
    /// A kernel over a fresh in-memory ledger, for tests and demos.
    pub fn in_memory(config: KernelConfig) -> Result<(Self, Arc<MemoryLedger>)> {
        let ledger = Arc::new(MemoryLedger::with_hash_scheme(
            config.schema,
            config.effective_hash_scheme(),
        ));
        let kernel = Self::new(config, ledger.clone(), ledger.clone())?;
        Ok((kernel, ledger))
    }
}
