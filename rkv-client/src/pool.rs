//! # Connection Pool
//!
//! Purpose: Reuse connections across roundtrips to avoid repeated dials and
//! handshakes, authenticating each connection once when it is created.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Idle connections live on a stack; the most
//!    recently returned one is handed out first because it is the warmest.
//! 2. **Minimal Locking**: The mutex is held only while pushing or popping,
//!    never across an await.
//! 3. **No Bookkeeping For Borrowed Connections**: A connection that is not
//!    idle is simply owned by whoever checked it out.
//! 4. **Trust On Reuse**: Idle connections are not revalidated; a stream the
//!    peer closed while idle fails on first use and is then discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::conn::{Authenticator, Connection, Dialer};
use crate::error::{ClientError, ClientResult};
use crate::resp::Codec;

type Conn<D> = Connection<<D as Dialer>::Stream>;

struct PoolInner<D: Dialer> {
    dialer: D,
    auth: Option<Box<dyn Authenticator<D::Stream>>>,
    codec: Codec,
    idle: Mutex<Vec<Conn<D>>>,
    next_id: AtomicU64,
}

/// Connection pool handle. Clones share the same idle stack.
pub struct Pool<D: Dialer> {
    inner: Arc<PoolInner<D>>,
}

impl<D: Dialer> Clone for Pool<D> {
    fn clone(&self) -> Self {
        Pool {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Dialer> Pool<D> {
    /// Creates a pool whose new connections need no handshake.
    pub fn new(dialer: D, codec: Codec) -> Self {
        Self::build(dialer, None, codec)
    }

    /// Creates a pool that authenticates every newly dialed connection.
    pub fn with_authenticator<A>(dialer: D, auth: A, codec: Codec) -> Self
    where
        A: Authenticator<D::Stream> + 'static,
    {
        Self::build(dialer, Some(Box::new(auth)), codec)
    }

    fn build(dialer: D, auth: Option<Box<dyn Authenticator<D::Stream>>>, codec: Codec) -> Self {
        Pool {
            inner: Arc::new(PoolInner {
                dialer,
                auth,
                codec,
                idle: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Codec handed to every connection this pool creates.
    pub fn codec(&self) -> Codec {
        self.inner.codec
    }

    /// Checks out a connection: the most recent idle one, or a new one.
    pub async fn get(&self) -> ClientResult<Conn<D>> {
        if let Some(conn) = self.pop_idle() {
            debug!(conn_id = conn.id(), "reusing idle connection");
            return Ok(conn);
        }

        let stream = self.inner.dialer.dial().await?;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut conn = Connection::new(id, stream, self.inner.codec);
        debug!(conn_id = id, "dialed new connection");

        if let Some(auth) = &self.inner.auth {
            let verdict = auth.authenticate(&mut conn).await;
            let err = match verdict {
                Ok(true) => return Ok(conn),
                Ok(false) => ClientError::AuthFailed,
                Err(err) => err,
            };
            // `discard` logs the failure with the connection id.
            conn.discard(&err).await;
            return Err(err);
        }
        Ok(conn)
    }

    /// Returns a connection to the idle stack.
    pub fn put(&self, conn: Conn<D>) {
        let mut idle = self.inner.idle.lock().expect("pool mutex poisoned");
        idle.push(conn);
    }

    /// Number of idle connections.
    pub fn idle_len(&self) -> usize {
        self.inner.idle.lock().expect("pool mutex poisoned").len()
    }

    fn pop_idle(&self) -> Option<Conn<D>> {
        let mut idle = self.inner.idle.lock().expect("pool mutex poisoned");
        idle.pop()
    }
}
