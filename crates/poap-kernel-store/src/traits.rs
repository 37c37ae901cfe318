//! SessionStore trait: the abstract interface for session persistence.

use async_trait::async_trait;

use crate::error::Result;
use crate::session::Session;

/// Async interface for admin session persistence.
///
/// Records are keyed by the Blake3 digest of the token. Time is passed in
/// explicitly so expiry is deterministic under test.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a live session. Expired sessions are reported as absent.
    async fn get(&self, token: &str, now: u64) -> Result<Option<Session>>;

    /// Insert or replace a session.
    async fn set(&self, session: &Session) -> Result<()>;

    /// Remove a session. Returns whether one existed.
    async fn delete(&self, token: &str) -> Result<bool>;

    /// Purge every session expired at `now`. Returns the number removed.
    async fn expire(&self, now: u64) -> Result<usize>;
}
