//! # Async Client API
//!
//! Purpose: Issue commands over pooled connections. `Client::query` is the
//! roundtrip engine every typed command method goes through; transactions and
//! subscribers are created from here and keep one connection for themselves.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `Client` hides pooling and protocol details.
//! 2. **Close On Failure**: A roundtrip that fails to send or decode closes
//!    its connection instead of returning it; a server error reply is a
//!    normal reply and the connection goes back to the pool.
//! 3. **Explicit Configuration**: The codec and dialer are values passed in,
//!    not process-wide singletons.

use std::time::Duration;

use serde::Deserialize;

use crate::cmd::{self, ScanOptions};
use crate::conn::{Dialer, PasswordAuth, TcpDialer};
use crate::error::{ClientError, ClientResult};
use crate::pool::Pool;
use crate::pubsub::Subscriber;
use crate::reply::{Arg, Command, Reply};
use crate::resp::{ArrayErrors, Codec, DEFAULT_MAX_BULK_LEN};
use crate::scan::{ScanKind, Scanner};
use crate::transaction::Transaction;

/// Configuration for the TCP client and its pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Sent with `AUTH` on every new connection when set.
    pub password: Option<String>,
    /// Optional TCP connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Treatment of error elements nested in array replies.
    pub array_errors: ArrayErrors,
    /// Largest bulk reply accepted, in bytes.
    pub max_bulk_len: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:6379".to_string(),
            password: None,
            connect_timeout_ms: None,
            array_errors: ArrayErrors::Drop,
            max_bulk_len: DEFAULT_MAX_BULK_LEN,
        }
    }
}

impl ClientConfig {
    pub const ENV_ADDR: &'static str = "RKV_ADDR";
    pub const ENV_PASSWORD: &'static str = "RKV_PASSWORD";
    pub const ENV_CONNECT_TIMEOUT_MS: &'static str = "RKV_CONNECT_TIMEOUT_MS";

    /// Reads `RKV_ADDR`, `RKV_PASSWORD` and `RKV_CONNECT_TIMEOUT_MS`, falling
    /// back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = ClientConfig::default();
        if let Some(addr) = lookup(Self::ENV_ADDR) {
            config.addr = addr;
        }
        config.password = lookup(Self::ENV_PASSWORD).filter(|p| !p.is_empty());
        config.connect_timeout_ms = lookup(Self::ENV_CONNECT_TIMEOUT_MS).and_then(|raw| raw.parse().ok());
        config
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
}

/// TTL state returned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Key is missing or already expired.
    Missing,
    /// Key exists without expiration.
    NoExpiry,
    /// Key expires after the provided duration.
    ExpiresIn(Duration),
}

impl Ttl {
    pub(crate) fn from_reply(reply: Reply, unit: fn(u64) -> Duration) -> ClientResult<Self> {
        match reply.into_integer()? {
            -2 => Ok(Ttl::Missing),
            -1 => Ok(Ttl::NoExpiry),
            value if value >= 0 => Ok(Ttl::ExpiresIn(unit(value as u64))),
            _ => Err(ClientError::UnexpectedResponse {
                expected: "ttl",
                found: "integer",
            }),
        }
    }
}

/// Async client with connection pooling.
///
/// Each call checks out a connection, executes one command, and returns the
/// connection to the pool. Clones share the pool.
pub struct Client<D: Dialer = TcpDialer> {
    pool: Pool<D>,
}

impl<D: Dialer> Clone for Client<D> {
    fn clone(&self) -> Self {
        Client {
            pool: self.pool.clone(),
        }
    }
}

impl Client<TcpDialer> {
    /// Builds a TCP client without touching the network.
    pub fn create(config: ClientConfig) -> Self {
        let dialer = TcpDialer::new(config.addr.clone()).with_connect_timeout(config.connect_timeout());
        let codec = Codec::new()
            .with_array_errors(config.array_errors)
            .with_max_bulk_len(config.max_bulk_len);
        let pool = match config.password {
            Some(password) => Pool::with_authenticator(dialer, PasswordAuth::new(password), codec),
            None => Pool::new(dialer, codec),
        };
        Client { pool }
    }

    /// Builds a TCP client and verifies the server answers `PING`.
    pub async fn connect(config: ClientConfig) -> ClientResult<Self> {
        let client = Self::create(config);
        client.ping(None).await?;
        Ok(client)
    }
}

impl<D: Dialer> Client<D> {
    /// Wraps an existing pool, e.g. one built over a custom dialer.
    pub fn with_pool(pool: Pool<D>) -> Self {
        Client { pool }
    }

    pub fn pool(&self) -> &Pool<D> {
        &self.pool
    }

    /// Sends one command on a pooled connection and returns its reply.
    ///
    /// Error replies come back as `Reply::Error`; only transport and framing
    /// failures are returned as `Err`, and they close the connection.
    pub async fn query(&self, command: &Command) -> ClientResult<Reply> {
        let mut conn = self.pool.get().await?;
        match conn.exec(command).await {
            Ok(reply) => {
                self.pool.put(conn);
                Ok(reply)
            }
            Err(err) => {
                conn.discard(&err).await;
                Err(err)
            }
        }
    }

    /// Starts a transaction holding one connection until it is closed.
    pub async fn pipeline(&self) -> ClientResult<Transaction<D>> {
        let conn = self.pool.get().await?;
        Ok(Transaction::new(self.pool.clone(), conn))
    }

    /// Subscribes to `channels` on a dedicated connection.
    ///
    /// The connection never returns to the pool.
    pub async fn subscribe<I, A>(&self, channels: I) -> ClientResult<Subscriber<D::Stream>>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        let command = cmd::subscribe(channels);
        if command.arguments().is_empty() {
            return Err(ClientError::InvalidArguments(
                "subscribe expects at least one channel".to_string(),
            ));
        }
        let conn = self.pool.get().await?;
        Subscriber::start(conn, &command).await
    }

    /// Iterates a keyspace, hash, set or sorted set with the scan family.
    pub fn scanner(&self, kind: ScanKind, options: ScanOptions) -> Scanner<'_, D> {
        Scanner::new(self, kind, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.addr, "127.0.0.1:6379");
        assert_eq!(config.password, None);
        assert_eq!(config.connect_timeout(), None);
        assert_eq!(config.array_errors, ArrayErrors::Drop);
    }

    #[test]
    fn config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ClientConfig::ENV_ADDR, "10.0.0.1:7000"),
            (ClientConfig::ENV_PASSWORD, "secret"),
            (ClientConfig::ENV_CONNECT_TIMEOUT_MS, "250"),
        ]
        .into_iter()
        .collect();
        let config = ClientConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(config.addr, "10.0.0.1:7000");
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.connect_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn empty_password_means_no_auth() {
        let config = ClientConfig::from_lookup(|name| {
            (name == ClientConfig::ENV_PASSWORD).then(String::new)
        });
        assert_eq!(config.password, None);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"addr":"db:6379","array_errors":"keep","max_bulk_len":1024}"#).unwrap();
        assert_eq!(config.addr, "db:6379");
        assert_eq!(config.max_bulk_len, 1024);
        assert_eq!(config.password, None);
        assert_eq!(config.array_errors, ArrayErrors::Keep);
    }

    #[test]
    fn ttl_maps_sentinels() {
        assert_eq!(Ttl::from_reply(Reply::Integer(-2), Duration::from_secs).unwrap(), Ttl::Missing);
        assert_eq!(Ttl::from_reply(Reply::Integer(-1), Duration::from_secs).unwrap(), Ttl::NoExpiry);
        assert_eq!(
            Ttl::from_reply(Reply::Integer(1500), Duration::from_millis).unwrap(),
            Ttl::ExpiresIn(Duration::from_millis(1500))
        );
        assert!(Ttl::from_reply(Reply::Integer(-3), Duration::from_secs).is_err());
    }
}
