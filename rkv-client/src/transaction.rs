//! # Transactions
//!
//! Purpose: Queue commands client-side and replay them as one
//! `MULTI` / commands / `EXEC` batch on a single held connection.
//!
//! ## Design Principles
//! 1. **Collect Then Execute**: Queuing performs no I/O; `exec` streams the
//!    whole batch and returns the `EXEC` array in issue order.
//! 2. **One Connection**: The transaction owns its connection from creation
//!    to teardown; `WATCH`, `UNWATCH` and `DISCARD` run on it directly.
//! 3. **Return On Teardown**: Dropping the transaction puts a healthy
//!    connection back in the pool; a connection that failed is closed instead.

use crate::cmd;
use crate::conn::{Connection, Dialer, Held};
use crate::error::{ClientError, ClientResult};
use crate::pool::Pool;
use crate::reply::{Arg, Command, Reply};

/// A `MULTI`/`EXEC` batch bound to one pooled connection.
pub struct Transaction<D: Dialer> {
    pool: Pool<D>,
    held: Held<D::Stream>,
    queue: Vec<Command>,
    // Between MULTI and the EXEC reply the server is buffering commands.
    in_batch: bool,
}

impl<D: Dialer> Transaction<D> {
    pub(crate) fn new(pool: Pool<D>, conn: Connection<D::Stream>) -> Self {
        Transaction {
            pool,
            held: Held::new(conn),
            queue: Vec::new(),
            in_batch: false,
        }
    }

    /// Appends a command to the batch. Nothing is sent until `exec`.
    pub fn queue(&mut self, command: Command) -> &mut Self {
        self.queue.push(command);
        self
    }

    /// Number of commands waiting for `exec`.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// False once a failure has closed the held connection.
    pub fn is_open(&self) -> bool {
        self.held.is_open()
    }

    /// Sends `MULTI`, every queued command, then `EXEC`.
    ///
    /// The queue is empty afterwards whether or not the batch succeeded.
    /// Returns `TransactionAborted` when a watched key changed.
    pub async fn exec(&mut self) -> ClientResult<Vec<Reply>> {
        let commands = std::mem::take(&mut self.queue);

        self.in_batch = true;
        if let Reply::Error(message) = self.held.exec(&cmd::multi()).await? {
            self.in_batch = false;
            return Err(ClientError::Server { message });
        }
        // The server only answers QUEUED here; results arrive with EXEC.
        for command in &commands {
            self.held.exec(command).await?;
        }
        let reply = self.held.exec(&cmd::exec()).await?;
        self.in_batch = false;

        reply.into_opt_array()?.ok_or(ClientError::TransactionAborted)
    }

    /// Watches keys for changes before the next `exec`.
    pub async fn watch<I, A>(&mut self, keys: I) -> ClientResult<String>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.held.exec(&cmd::watch(keys)).await?.into_status()
    }

    /// Forgets every watched key.
    pub async fn unwatch(&mut self) -> ClientResult<String> {
        self.held.exec(&cmd::unwatch()).await?.into_status()
    }

    /// Sends `DISCARD` on the held connection. The local queue is untouched.
    pub async fn discard(&mut self) -> ClientResult<String> {
        self.held.exec(&cmd::discard()).await?.into_status()
    }

    /// Returns the connection to the pool.
    pub fn close(self) {}
}

impl<D: Dialer> Drop for Transaction<D> {
    fn drop(&mut self) {
        // An interrupted batch leaves the server mid-MULTI; let the stream drop.
        if self.in_batch {
            return;
        }
        if let Some(conn) = self.held.take_reusable() {
            self.pool.put(conn);
        }
    }
}
