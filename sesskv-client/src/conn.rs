//! # Async Connection
//!
//! Purpose: Own a single TCP connection to a Redis-compatible server and
//! expose the handful of commands the session store issues.
//!
//! ## Design Principles
//! 1. **Owned Resource**: One connection, one owner; no sharing, no locking.
//! 2. **Observable Liveness**: Transport failures flip `connected` so the
//!    owner can redial; server error replies leave the connection healthy.
//! 3. **Fail Fast**: Protocol violations surface immediately as errors.
//! 4. **Buffer Reuse**: Framing and parsing reuse per-connection buffers.

use thiserror::Error;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::resp::{self, RespValue};

/// Result type for client calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the connection.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// RESP2 framing or parse error.
    #[error("protocol error")]
    Protocol,
    /// Server returned an error reply.
    #[error("server error: {}", String::from_utf8_lossy(.message))]
    Server {
        /// Raw payload of the `-ERR ...` reply.
        message: Vec<u8>,
    },
    /// Reply type did not match the expected command reply.
    #[error("unexpected response")]
    UnexpectedResponse,
}

/// Single async connection with reusable buffers.
///
/// The buffers are stored on the connection to avoid per-call allocations.
#[derive(Debug)]
pub struct RedisConnection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
    connected: bool,
}

impl RedisConnection {
    /// Opens a TCP connection to the server.
    pub async fn connect(host: &str, port: u16) -> ClientResult<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;

        Ok(RedisConnection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
            connected: true,
        })
    }

    /// Whether the transport is still considered usable.
    ///
    /// The flag flips to false on the first IO or framing failure and never
    /// recovers; a dead connection is replaced, not repaired.
    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Authenticates with the server password.
    pub async fn auth(&mut self, password: &str) -> ClientResult<()> {
        match self.exec(&[b"AUTH", password.as_bytes()]).await? {
            RespValue::Simple(_) => Ok(()),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Switches to the given logical database.
    pub async fn select(&mut self, index: u32) -> ClientResult<()> {
        let (digits, len) = encode_u64(index as u64);
        match self.exec(&[b"SELECT", &digits[..len]]).await? {
            RespValue::Simple(_) => Ok(()),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Fetches a value by key.
    ///
    /// Returns `Ok(None)` when the key is missing.
    pub async fn get(&mut self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        match self.exec(&[b"GET", key]).await? {
            RespValue::Bulk(data) => Ok(data),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a value and attaches an expiration in seconds.
    pub async fn set_ex(&mut self, key: &[u8], value: &[u8], ttl_seconds: u64) -> ClientResult<()> {
        let (seconds, len) = encode_u64(ttl_seconds);
        match self.exec(&[b"SET", key, value, b"EX", &seconds[..len]]).await? {
            RespValue::Simple(_) => Ok(()),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a time-to-live on a key. Returns true when the key existed.
    pub async fn expire(&mut self, key: &[u8], ttl_seconds: u64) -> ClientResult<bool> {
        let (seconds, len) = encode_u64(ttl_seconds);
        match self.exec(&[b"EXPIRE", key, &seconds[..len]]).await? {
            RespValue::Integer(value) => Ok(value == 1),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Deletes a key. Returns true when a key was removed.
    pub async fn del(&mut self, key: &[u8]) -> ClientResult<bool> {
        match self.exec(&[b"DEL", key]).await? {
            RespValue::Integer(count) => Ok(count > 0),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Pings the server. Returns the raw reply payload.
    pub async fn ping(&mut self, payload: Option<&[u8]>) -> ClientResult<Vec<u8>> {
        let reply = match payload {
            Some(data) => self.exec(&[b"PING", data]).await?,
            None => self.exec(&[b"PING"]).await?,
        };
        match reply {
            RespValue::Simple(text) => Ok(text),
            RespValue::Bulk(Some(data)) => Ok(data),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    async fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let result = self.exec_inner(args).await;
        if matches!(result, Err(ClientError::Io(_)) | Err(ClientError::Protocol)) {
            // The stream position is unknown after an IO or framing failure.
            self.connected = false;
        }
        result
    }

    async fn exec_inner(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        self.write_buf.clear();
        resp::encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf).await?;
        stream.flush().await?;

        resp::read_reply(&mut self.reader, &mut self.line_buf).await
    }
}

fn encode_u64(mut value: u64) -> ([u8; 20], usize) {
    // Stack buffer keeps the conversion allocation-free.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        return (buf, 1);
    }
    while value > 0 {
        buf[len] = b'0' + (value % 10) as u8;
        value /= 10;
        len += 1;
    }
    buf[..len].reverse();
    (buf, len)
}
