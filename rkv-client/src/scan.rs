//! Cursor iteration over the `SCAN` command family.

use tracing::debug;

use crate::client::Client;
use crate::cmd::{self, ScanOptions};
use crate::conn::Dialer;
use crate::error::{ClientError, ClientResult};
use crate::reply::{Command, Reply};

/// What a `Scanner` walks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanKind {
    /// The keyspace (`SCAN`).
    Keys,
    /// Field/value pairs of a hash (`HSCAN`).
    Hash(String),
    /// Members of a set (`SSCAN`).
    Set(String),
    /// Member/score pairs of a sorted set (`ZSCAN`).
    SortedSet(String),
}

impl ScanKind {
    fn command(&self, cursor: u64, options: &ScanOptions) -> Command {
        match self {
            ScanKind::Keys => cmd::scan(cursor, options),
            ScanKind::Hash(key) => cmd::hscan(key, cursor, options),
            ScanKind::Set(key) => cmd::sscan(key, cursor, options),
            ScanKind::SortedSet(key) => cmd::zscan(key, cursor, options),
        }
    }
}

/// Walks a cursor until the server hands back cursor `0`.
///
/// Batches may be empty or repeat elements; that is how the server iterates.
pub struct Scanner<'a, D: Dialer> {
    client: &'a Client<D>,
    kind: ScanKind,
    options: ScanOptions,
    cursor: u64,
    finished: bool,
}

impl<'a, D: Dialer> Scanner<'a, D> {
    pub(crate) fn new(client: &'a Client<D>, kind: ScanKind, options: ScanOptions) -> Self {
        Scanner {
            client,
            kind,
            options,
            cursor: 0,
            finished: false,
        }
    }

    /// Fetches the next batch, or `None` once the iteration is complete.
    ///
    /// An error finishes the scanner.
    pub async fn next_batch(&mut self) -> ClientResult<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }
        let command = self.kind.command(self.cursor, &self.options);
        let batch = match self.client.query(&command).await.and_then(split_batch) {
            Ok(batch) => batch,
            Err(err) => {
                self.finished = true;
                return Err(err);
            }
        };
        let (cursor, items) = batch;
        debug!(cursor, items = items.len(), "scan batch");
        self.cursor = cursor;
        self.finished = cursor == 0;
        Ok(Some(items))
    }

    pub fn has_next(&self) -> bool {
        !self.finished
    }

    /// Drains the remaining batches into one vector.
    pub async fn collect_all(&mut self) -> ClientResult<Vec<String>> {
        let mut all = Vec::new();
        while let Some(batch) = self.next_batch().await? {
            all.extend(batch);
        }
        Ok(all)
    }
}

/// Splits a `[cursor, [items...]]` reply.
pub(crate) fn split_batch(reply: Reply) -> ClientResult<(u64, Vec<String>)> {
    let mut parts = reply.into_array()?.into_iter();
    let (Some(cursor), Some(items), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ClientError::UnexpectedResponse {
            expected: "scan reply",
            found: "array",
        });
    };
    let found = cursor.kind();
    let cursor = cursor
        .into_status()
        .ok()
        .and_then(|text| text.parse::<u64>().ok())
        .ok_or(ClientError::UnexpectedResponse {
            expected: "numeric cursor",
            found,
        })?;
    Ok((cursor, items.into_string_vec()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(cursor: &str, items: &[&str]) -> Reply {
        Reply::Array(vec![
            Reply::Bulk(cursor.to_string()),
            Reply::Array(items.iter().map(|item| Reply::Bulk(item.to_string())).collect()),
        ])
    }

    #[test]
    fn split_batch_reads_cursor_and_items() {
        let (cursor, items) = split_batch(batch("17", &["a", "b"])).unwrap();
        assert_eq!(cursor, 17);
        assert_eq!(items, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn split_batch_rejects_non_numeric_cursor() {
        let err = split_batch(batch("next", &[])).unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnexpectedResponse { expected: "numeric cursor", .. }
        ));
    }

    #[test]
    fn split_batch_rejects_wrong_arity() {
        let reply = Reply::Array(vec![Reply::Bulk("0".into())]);
        assert!(matches!(split_batch(reply), Err(ClientError::UnexpectedResponse { .. })));
    }

    #[test]
    fn split_batch_maps_error_reply() {
        let err = split_batch(Reply::Error("ERR unknown command".into())).unwrap_err();
        assert!(matches!(err, ClientError::Server { .. }));
    }

    #[test]
    fn kind_picks_command() {
        let options = ScanOptions {
            pattern: Some("user:*".to_string()),
            count: None,
        };
        let command = ScanKind::Hash("h".into()).command(5, &options);
        assert_eq!(command.name(), "hscan");
        assert_eq!(command.arguments().len(), 4);
        assert_eq!(ScanKind::Keys.command(0, &ScanOptions::default()).name(), "scan");
    }
}
