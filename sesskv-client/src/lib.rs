//! # SessKV Async Client
//!
//! Purpose: Provide a minimal asynchronous RESP2 connection to a
//! Redis-compatible server, covering exactly the commands the session store
//! needs: AUTH, SELECT, GET, SET..EX, EXPIRE, DEL, and PING.
//!
//! ## Design Principles
//! 1. **Single Connection**: No pooling; callers serialize access themselves.
//! 2. **Explicit Liveness**: A `connected` flag flips on transport failure so
//!    owners can decide when to redial.
//! 3. **Minimal Allocation**: Reuse buffers for RESP framing and parsing.
//! 4. **Protocol Clarity**: Encode/parse RESP2 explicitly for correctness.

mod conn;
mod resp;

pub use conn::{ClientError, ClientResult, RedisConnection};
