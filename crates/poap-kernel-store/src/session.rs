//! Admin sessions: issuance, expiry and the stored record.

use std::fmt;
use std::path::PathBuf;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Default session lifetime: 24 hours.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Random bytes in a session token.
pub const TOKEN_BYTES: usize = 32;

/// Session store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of an issued session in seconds.
    pub ttl_secs: u64,
    /// SQLite file. `None` keeps sessions in memory.
    pub database: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            database: None,
        }
    }
}

/// Digest under which a session is stored. Raw tokens are never persisted.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenDigest(pub [u8; 32]);

impl TokenDigest {
    pub fn of(token: &str) -> Self {
        Self(*blake3::hash(token.as_bytes()).as_bytes())
    }
}

impl fmt::Debug for TokenDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenDigest({})", &hex::encode(self.0)[..16])
    }
}

/// An authenticated admin session.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token handed to the client (64 hex chars).
    pub token: String,
    /// Who the session belongs to.
    pub subject: String,
    /// Unix seconds.
    pub issued_at: u64,
    /// Unix seconds. The session is invalid from this instant on.
    pub expires_at: u64,
}

impl Session {
    /// Mint a new session with a fresh random token.
    pub fn issue(subject: impl Into<String>, ttl_secs: u64, now: u64) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self {
            token: hex::encode(bytes),
            subject: subject.into(),
            issued_at: now,
            expires_at: now.saturating_add(ttl_secs),
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }

    pub fn digest(&self) -> TokenDigest {
        TokenDigest::of(&self.token)
    }

    pub(crate) fn record(&self) -> SessionRecord {
        SessionRecord {
            subject: self.subject.clone(),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("subject", &self.subject)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The persisted part of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SessionRecord {
    pub subject: String,
    pub issued_at: u64,
    pub expires_at: u64,
}

impl SessionRecord {
    pub fn into_session(self, token: &str) -> Session {
        Session {
            token: token.to_string(),
            subject: self.subject,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
        }
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}
