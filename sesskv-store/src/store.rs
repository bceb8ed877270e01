//! # Session Store Core
//!
//! Purpose: Tie the serialization gate, the connection lifecycle, and the
//! remote primitives together behind the four session operations.
//!
//! ## Design Principles
//! 1. **Gate Everything**: The connection slot is only reachable through the
//!    async mutex, held from liveness check to command completion.
//! 2. **Lazy Setup**: connect → auth → select runs on first use and after any
//!    transport loss, as a short-circuiting sequence of awaits.
//! 3. **No Retries**: Every failure surfaces to the caller; the next call is a
//!    fresh attempt.

use sesskv_client::{ClientError, RedisConnection};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::error::{RemoteOp, StoreError};

/// Session-data store backed by a Redis-compatible server.
///
/// One store instance owns one lazily-established connection. Operations on
/// the same instance are fully serialized: the internal gate is held across
/// the entire connect-if-needed + execute sequence, so no two operations ever
/// interleave their network activity. Different instances are independent.
///
/// Gate acquisition has no timeout; an operation whose network stage hangs
/// blocks later operations on the same instance. Callers that need deadlines
/// should wrap calls in `tokio::time::timeout`.
#[derive(Debug)]
pub struct SessionStore {
    config: StoreConfig,
    /// Connection slot, guarded by the serialization gate. `None` until the
    /// first operation connects, and again after a setup failure tears the
    /// handle down.
    slot: Mutex<Option<RedisConnection>>,
}

impl SessionStore {
    /// Creates a store for the given configuration.
    ///
    /// No connection is made here; the first operation dials the server.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::InvalidConfig)?;
        Ok(SessionStore {
            config,
            slot: Mutex::new(None),
        })
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Loads the session data stored under `session_id`.
    ///
    /// Returns `Ok(None)` for an identifier that was never saved, was
    /// deleted, or whose entry expired; absence is not an error.
    pub async fn load(&self, session_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let key = self.session_key(session_id);
        let mut slot = self.slot.lock().await;
        let conn = self.ensure_connected(&mut slot).await?;
        trace!(key = %key, "load");
        conn.get(key.as_bytes())
            .await
            .map_err(|source| self.remote_error(RemoteOp::Get, key, source))
    }

    /// Saves `data` under `session_id` with the configured time-to-live.
    pub async fn save(&self, session_id: &str, data: &[u8]) -> Result<(), StoreError> {
        let key = self.session_key(session_id);
        let mut slot = self.slot.lock().await;
        let conn = self.ensure_connected(&mut slot).await?;
        trace!(key = %key, bytes = data.len(), "save");
        conn.set_ex(key.as_bytes(), data, self.config.ttl_seconds)
            .await
            .map_err(|source| self.remote_error(RemoteOp::SetWithTtl, key, source))
    }

    /// Refreshes the time-to-live of the entry under `session_id` without
    /// altering its payload.
    ///
    /// Touching an absent identifier is not an error.
    pub async fn touch(&self, session_id: &str) -> Result<(), StoreError> {
        let key = self.session_key(session_id);
        let mut slot = self.slot.lock().await;
        let conn = self.ensure_connected(&mut slot).await?;
        trace!(key = %key, "touch");
        conn.expire(key.as_bytes(), self.config.ttl_seconds)
            .await
            .map(|_| ())
            .map_err(|source| self.remote_error(RemoteOp::Expire, key, source))
    }

    /// Deletes the entry under `session_id`.
    ///
    /// Deleting an absent identifier is not an error.
    pub async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let key = self.session_key(session_id);
        let mut slot = self.slot.lock().await;
        let conn = self.ensure_connected(&mut slot).await?;
        trace!(key = %key, "delete");
        conn.del(key.as_bytes())
            .await
            .map(|_| ())
            .map_err(|source| self.remote_error(RemoteOp::Delete, key, source))
    }

    fn session_key(&self, session_id: &str) -> String {
        format!("{}{}", self.config.key_prefix, session_id)
    }

    /// Returns a live connection, dialing and preparing one if the slot is
    /// empty or the handle reports the transport gone.
    ///
    /// Liveness is re-read from the handle on every call, never cached. Called
    /// with the gate held, which is what makes the check-then-connect sequence
    /// race-free.
    async fn ensure_connected<'a>(
        &self,
        slot: &'a mut Option<RedisConnection>,
    ) -> Result<&'a mut RedisConnection, StoreError> {
        if matches!(slot, Some(conn) if conn.connected()) {
            return Ok(slot.as_mut().unwrap());
        }

        // Discard any dead handle before dialing so a setup failure leaves
        // the slot empty and the next call starts from scratch.
        *slot = None;
        let conn = self.open_connection().await?;
        Ok(slot.insert(conn))
    }

    /// Runs the full setup sequence: connect, then auth when a password is
    /// configured, then select when the database index is nonzero. Each step
    /// short-circuits on failure.
    async fn open_connection(&self) -> Result<RedisConnection, StoreError> {
        let host = &self.config.host;
        let port = self.config.port;
        debug!(host = %host, port, "connecting to session backend");

        let mut conn = RedisConnection::connect(host, port).await.map_err(|source| {
            warn!(host = %host, port, error = %source, "connect failed");
            StoreError::ConnectFailed {
                host: host.clone(),
                port,
                source,
            }
        })?;

        if let Some(password) = &self.config.password {
            conn.auth(password).await.map_err(|source| {
                warn!(host = %host, port, error = %source, "authentication failed");
                StoreError::AuthFailed {
                    host: host.clone(),
                    port,
                    source,
                }
            })?;
        }

        if self.config.database != 0 {
            // Failure here drops the fresh connection: a handle left on the
            // wrong database must never serve commands.
            let index = self.config.database;
            conn.select(index).await.map_err(|source| {
                warn!(host = %host, port, index, error = %source, "database select failed");
                StoreError::SelectFailed {
                    index,
                    host: host.clone(),
                    port,
                    source,
                }
            })?;
        }

        debug!(host = %host, port, database = self.config.database, "session backend ready");
        Ok(conn)
    }

    fn remote_error(&self, op: RemoteOp, key: String, source: ClientError) -> StoreError {
        warn!(%op, key = %key, error = %source, "remote command failed");
        StoreError::RemoteOpFailed { op, key, source }
    }
}
