//! Store error taxonomy.

use std::fmt;

use sesskv_client::ClientError;
use thiserror::Error;

/// Remote primitive that failed after a healthy connection was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOp {
    Get,
    SetWithTtl,
    Expire,
    Delete,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemoteOp::Get => "get",
            RemoteOp::SetWithTtl => "set",
            RemoteOp::Expire => "expire",
            RemoteOp::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the session store.
///
/// Each variant names the stage that failed and carries the context needed to
/// identify the target: host and port for setup stages, the database index for
/// SELECT, and the full backend key for remote primitives.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The transport could not establish a socket.
    #[error("failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: ClientError,
    },
    /// The password was rejected or the auth exchange failed.
    #[error("failed to authenticate to {host}:{port}: {source}")]
    AuthFailed {
        host: String,
        port: u16,
        #[source]
        source: ClientError,
    },
    /// The logical database switch was rejected.
    #[error("failed to select database {index} on {host}:{port}: {source}")]
    SelectFailed {
        index: u32,
        host: String,
        port: u16,
        #[source]
        source: ClientError,
    },
    /// A get/set/expire/delete primitive failed on a healthy connection.
    #[error("{op} failed for key {key:?}: {source}")]
    RemoteOpFailed {
        op: RemoteOp,
        key: String,
        #[source]
        source: ClientError,
    },
    /// The configuration violates a construction-time invariant.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}
