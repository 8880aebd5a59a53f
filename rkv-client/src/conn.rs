//! # Connections, Dialers and Authenticators
//!
//! Purpose: Wrap one duplex byte stream with the buffers and codec it needs
//! for request/response cycles, and define the seams the pool uses to create
//! and authenticate new streams.
//!
//! ## Design Principles
//! 1. **Exclusive Ownership**: A `Connection` is moved between its owners
//!    (pool, engine, transaction, subscriber), never shared.
//! 2. **Strategy Pattern**: `Dialer` and `Authenticator` are traits so tests
//!    can plug in in-memory streams and scripted handshakes.
//! 3. **Buffer Reuse**: Each connection keeps its own line and write buffers.
//! 4. **Close On Failure**: A connection that failed once is closed, never
//!    reused; RESP has no request ids to resynchronize a stream.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::reply::{Command, Reply};
use crate::resp::Codec;

/// Byte stream usable as a connection transport.
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> Stream for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// Creates new transport streams for the pool.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Stream: Stream;

    /// Opens a new stream. Called only when the pool has no idle connection.
    async fn dial(&self) -> ClientResult<Self::Stream>;
}

/// Runs the handshake on a freshly dialed connection.
///
/// `Ok(false)` and `Err(_)` both reject the connection; the pool closes it
/// either way.
#[async_trait]
pub trait Authenticator<S: Stream>: Send + Sync {
    async fn authenticate(&self, conn: &mut Connection<S>) -> ClientResult<bool>;
}

/// Single connection with reusable buffers.
pub struct Connection<S> {
    id: u64,
    // Buffered reader reduces syscalls; writes pass straight through.
    stream: BufReader<S>,
    codec: Codec,
    line_buf: Vec<u8>,
    write_buf: BytesMut,
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<S: Stream> Connection<S> {
    pub fn new(id: u64, stream: S, codec: Codec) -> Self {
        Connection {
            id,
            stream: BufReader::new(stream),
            codec,
            line_buf: Vec::with_capacity(128),
            write_buf: BytesMut::with_capacity(256),
        }
    }

    /// Pool-assigned identifier, stable for the connection's lifetime.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Encodes and flushes one command.
    pub async fn send(&mut self, command: &Command) -> ClientResult<()> {
        let codec = self.codec;
        codec
            .encode_to(&mut self.stream, command, &mut self.write_buf)
            .await
    }

    /// Reads and decodes exactly one reply.
    pub async fn recv(&mut self) -> ClientResult<Reply> {
        let codec = self.codec;
        codec.decode(&mut self.stream, &mut self.line_buf).await
    }

    /// One request/response cycle.
    pub async fn exec(&mut self, command: &Command) -> ClientResult<Reply> {
        self.send(command).await?;
        self.recv().await
    }

    /// Shuts the write half down and drops the stream.
    pub async fn close(mut self) -> ClientResult<()> {
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }

    /// Closes a connection that just produced `cause`.
    pub(crate) async fn discard(self, cause: &ClientError) {
        let id = self.id;
        warn!(conn_id = id, error = %cause, "closing connection after failure");
        if let Err(err) = self.close().await {
            debug!(conn_id = id, error = %err, "close failed");
        }
    }
}

/// A connection checked out for a sequence of operations.
///
/// The first failing operation closes the connection; every later call
/// reports `ConnectionClosed`.
pub(crate) struct Held<S> {
    slot: Option<Connection<S>>,
    // Set from the start of a send until its reply is read, so a dropped
    // future never leaves an unread reply on a reusable connection.
    awaiting_reply: bool,
}

impl<S: Stream> Held<S> {
    pub(crate) fn new(conn: Connection<S>) -> Self {
        Held {
            slot: Some(conn),
            awaiting_reply: false,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.slot.is_some()
    }

    /// Hands the connection back unless a reply is still outstanding.
    pub(crate) fn take_reusable(&mut self) -> Option<Connection<S>> {
        let conn = self.slot.take()?;
        if self.awaiting_reply {
            debug!(conn_id = conn.id(), "dropping connection with an unread reply");
            return None;
        }
        Some(conn)
    }

    pub(crate) async fn send(&mut self, command: &Command) -> ClientResult<()> {
        let conn = self.slot.as_mut().ok_or(ClientError::ConnectionClosed)?;
        self.awaiting_reply = true;
        let result = conn.send(command).await;
        if let Err(err) = &result {
            self.fail(err).await;
        }
        result
    }

    pub(crate) async fn recv(&mut self) -> ClientResult<Reply> {
        let conn = self.slot.as_mut().ok_or(ClientError::ConnectionClosed)?;
        let result = conn.recv().await;
        match &result {
            Ok(_) => self.awaiting_reply = false,
            Err(err) => self.fail(err).await,
        }
        result
    }

    pub(crate) async fn exec(&mut self, command: &Command) -> ClientResult<Reply> {
        self.send(command).await?;
        self.recv().await
    }

    /// Shuts the held connection down, if it is still open.
    pub(crate) async fn close(&mut self) -> ClientResult<()> {
        match self.slot.take() {
            Some(conn) => conn.close().await,
            None => Ok(()),
        }
    }

    /// Closes the held connection because of `cause`.
    pub(crate) async fn fail(&mut self, cause: &ClientError) {
        if let Some(conn) = self.slot.take() {
            conn.discard(cause).await;
        }
    }
}

/// Dials TCP connections to a fixed address.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    addr: String,
    connect_timeout: Option<Duration>,
}

impl TcpDialer {
    pub fn new(addr: impl Into<String>) -> Self {
        TcpDialer {
            addr: addr.into(),
            connect_timeout: None,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self) -> ClientResult<TcpStream> {
        let addr = lookup_host(self.addr.as_str())
            .await
            .map_err(|_| ClientError::InvalidAddress(self.addr.clone()))?
            .next()
            .ok_or_else(|| ClientError::InvalidAddress(self.addr.clone()))?;

        let stream = match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, TcpStream::connect(addr))
                .await
                .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"))??,
            None => TcpStream::connect(addr).await?,
        };
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// Sends `AUTH <password>` and accepts only a literal `OK` status.
#[derive(Clone)]
pub struct PasswordAuth {
    password: String,
}

impl PasswordAuth {
    pub fn new(password: impl Into<String>) -> Self {
        PasswordAuth {
            password: password.into(),
        }
    }
}

#[async_trait]
impl<S: Stream> Authenticator<S> for PasswordAuth {
    async fn authenticate(&self, conn: &mut Connection<S>) -> ClientResult<bool> {
        let reply = conn
            .exec(&Command::new("auth").arg(self.password.as_str()))
            .await?;
        Ok(matches!(reply, Reply::Status(ref text) if text == "OK"))
    }
}
