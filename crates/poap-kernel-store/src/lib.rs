//! # POAP Kernel Store
//!
//! Session persistence for the admin surface.
//!
//! ## Key Types
//!
//! - [`SessionStore`] - Async trait implemented by every backend
//! - [`Session`] - A bearer token bound to a subject with an expiry
//! - [`MemorySessionStore`] - Process-lifetime store
//! - [`SqliteSessionStore`] - Durable store with versioned migrations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use poap_kernel_store::{MemorySessionStore, Session, SessionStore};
//!
//! let store = MemorySessionStore::new();
//! let session = Session::issue("admin", 86_400, now);
//! store.set(&session).await?;
//! assert!(store.get(&session.token, now).await?.is_some());
//! ```
//!
//! ## Design Notes
//!
//! - Records are keyed by the Blake3 digest of the token. A leaked database
//!   does not leak usable tokens.
//! - Stores are constructed explicitly and passed to their users. There is
//!   no process-global session map.

pub mod error;
pub mod memory;
pub mod migration;
pub mod session;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemorySessionStore;
pub use session::{Session, SessionConfig, TokenDigest, DEFAULT_SESSION_TTL_SECS};
pub use sqlite::SqliteSessionStore;
pub use traits::SessionStore;

use std::sync::Arc;

/// Open the backend a [`SessionConfig`] selects.
pub fn open_session_store(config: &SessionConfig) -> Result<Arc<dyn SessionStore>> {
    Ok(match &config.database {
        Some(path) => Arc::new(SqliteSessionStore::open(path)?),
        None => Arc::new(MemorySessionStore::new()),
    })
}
