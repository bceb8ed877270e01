//! # SessKV Session Store
//!
//! Purpose: Persist opaque session blobs in a Redis-compatible server, keyed
//! by session identifier, with TTL-based expiration.
//!
//! The store connects lazily: the first operation dials the server,
//! authenticates when a password is configured, and switches to the configured
//! logical database. All operations are serialized through a single-slot gate
//! so connection setup never races and commands observe a consistent
//! connection state.
//!
//! ## Design Principles
//! 1. **Owned Connection**: The connection lives inside the store instance,
//!    touched only under the gate; no ambient or pooled state.
//! 2. **Serialized Commands**: At most one command sequence is in flight per
//!    store instance, held across the whole connect-if-needed + execute span.
//! 3. **Fresh Attempts**: Setup failures leave no half-connected handle
//!    behind; every call starts the sequence from scratch.
//! 4. **Errors Name Their Stage**: Callers learn which step failed and against
//!    which host, port, database, or key.

mod config;
mod error;
mod store;

pub use config::StoreConfig;
pub use error::{RemoteOp, StoreError};
pub use store::SessionStore;
