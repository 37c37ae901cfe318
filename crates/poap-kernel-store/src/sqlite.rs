//! SQLite implementation of the SessionStore trait.
//!
//! Uses rusqlite with bundled SQLite. Every call runs on the blocking pool
//! via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::session::{Session, SessionRecord, TokenDigest};
use crate::traits::SessionStore;

/// SQLite-backed session store.
pub struct SqliteSessionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSessionStore {
    /// Open (or create) a database file and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock()?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn to_sql_time(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, token: &str, now: u64) -> Result<Option<Session>> {
        let digest = TokenDigest::of(token);
        let token = token.to_string();
        self.with_conn(move |conn| {
            let blob: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT record FROM sessions WHERE token_digest = ?1 AND expires_at > ?2",
                    params![digest.0.as_slice(), to_sql_time(now)],
                    |row| row.get(0),
                )
                .optional()?;
            blob.map(|b| SessionRecord::from_cbor(&b).map(|r| r.into_session(&token)))
                .transpose()
        })
        .await
    }

    async fn set(&self, session: &Session) -> Result<()> {
        let digest = session.digest();
        let expires_at = to_sql_time(session.expires_at);
        let record = session.record().to_cbor()?;
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO sessions (token_digest, expires_at, record)
                 VALUES (?1, ?2, ?3)",
                params![digest.0.as_slice(), expires_at, record],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, token: &str) -> Result<bool> {
        let digest = TokenDigest::of(token);
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM sessions WHERE token_digest = ?1",
                params![digest.0.as_slice()],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn expire(&self, now: u64) -> Result<usize> {
        let purged = self
            .with_conn(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM sessions WHERE expires_at <= ?1",
                    params![to_sql_time(now)],
                )?)
            })
            .await?;
        if purged > 0 {
            debug!(purged, "expired sessions purged");
        }
        Ok(purged)
    }
}
