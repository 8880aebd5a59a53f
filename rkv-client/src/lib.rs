//! # RKV Async Client
//!
//! Purpose: Provide an asynchronous Redis-compatible client that multiplexes
//! many logical callers over a small set of pooled TCP connections, with
//! transactions, pub/sub subscribers and cursor scans on top.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Reuse authenticated connections, last in first out.
//! 2. **Single Roundtrip Engine**: Every command goes through `Client::query`.
//! 3. **Owned Connections**: A connection is moved to whichever task is using
//!    it, so two requests can never interleave on one socket.
//! 4. **Replies As Values**: Server error replies come back as data and keep
//!    the connection; only I/O and framing failures discard it.

pub mod cmd;

mod client;
mod commands;
mod conn;
mod error;
mod pool;
mod pubsub;
mod reply;
mod resp;
mod scan;
mod transaction;

pub use client::{Client, ClientConfig, Ttl};
pub use cmd::{ListPosition, ScanOptions, SetExist, SetOptions};
pub use conn::{Authenticator, Connection, Dialer, PasswordAuth, Stream, TcpDialer};
pub use error::{ClientError, ClientResult};
pub use pool::Pool;
pub use pubsub::{Message, Subscriber};
pub use reply::{Arg, Command, Reply};
pub use resp::{ArrayErrors, Codec};
pub use scan::{ScanKind, Scanner};
pub use transaction::Transaction;
