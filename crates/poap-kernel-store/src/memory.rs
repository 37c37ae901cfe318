//! In-memory implementation of the SessionStore trait.
//!
//! Lives as long as the value that owns it. Thread-safe via RwLock.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;
use crate::session::{Session, SessionRecord, TokenDigest};
use crate::traits::SessionStore;

/// In-memory session store.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<TokenDigest, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired ones included.
    pub fn len(&self) -> Result<usize> {
        Ok(self.sessions.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, token: &str, now: u64) -> Result<Option<Session>> {
        let sessions = self.sessions.read()?;
        Ok(sessions
            .get(&TokenDigest::of(token))
            .filter(|r| now < r.expires_at)
            .map(|r| r.clone().into_session(token)))
    }

    async fn set(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()?
            .insert(session.digest(), session.record());
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<bool> {
        Ok(self
            .sessions
            .write()?
            .remove(&TokenDigest::of(token))
            .is_some())
    }

    async fn expire(&self, now: u64) -> Result<usize> {
        let mut sessions = self.sessions.write()?;
        let before = sessions.len();
        sessions.retain(|_, r| now < r.expires_at);
        Ok(before - sessions.len())
    }
}
