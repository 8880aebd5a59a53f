//! # Commands and Replies
//!
//! Purpose: Model what goes over the wire in both directions: a command with
//! printable arguments, and the closed set of reply shapes the server sends.
//!
//! ## Design Principles
//! 1. **Closed Union**: `Reply` has one variant per frame type, with a
//!    dedicated `Nil` so no text payload can be mistaken for absence.
//! 2. **Explicit Projections**: Call sites convert a `Reply` with a fallible
//!    `into_*` method instead of assuming its shape.
//! 3. **Printable Arguments**: Every argument becomes a text token at encode
//!    time; there are no binary arguments.

use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::{ClientError, ClientResult};

/// Decoded server reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// +OK or +PONG style replies.
    Status(String),
    /// $... bulk strings.
    Bulk(String),
    /// :123 replies.
    Integer(i64),
    /// $-1 or *-1: the key or value does not exist.
    Nil,
    /// *... arrays, possibly nested.
    Array(Vec<Reply>),
    /// -ERR ... replies.
    Error(String),
}

impl Reply {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Status(_) => "status",
            Reply::Bulk(_) => "bulk",
            Reply::Integer(_) => "integer",
            Reply::Nil => "nil",
            Reply::Array(_) => "array",
            Reply::Error(_) => "error",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    /// Status or bulk text, e.g. the `OK` of a `SET`.
    pub fn into_status(self) -> ClientResult<String> {
        match self {
            Reply::Status(text) | Reply::Bulk(text) => Ok(text),
            other => Err(other.mismatch("status")),
        }
    }

    /// Text that may be absent (`GET`, `LPOP`, `HGET`).
    pub fn into_opt_string(self) -> ClientResult<Option<String>> {
        match self {
            Reply::Bulk(text) | Reply::Status(text) => Ok(Some(text)),
            Reply::Nil => Ok(None),
            other => Err(other.mismatch("bulk")),
        }
    }

    /// Text that must be present.
    pub fn into_string(self) -> ClientResult<String> {
        match self {
            Reply::Bulk(text) | Reply::Status(text) => Ok(text),
            other => Err(other.mismatch("bulk")),
        }
    }

    pub fn into_integer(self) -> ClientResult<i64> {
        match self {
            Reply::Integer(value) => Ok(value),
            other => Err(other.mismatch("integer")),
        }
    }

    /// Integer that may be absent (`ZRANK` on a missing member).
    pub fn into_opt_integer(self) -> ClientResult<Option<i64>> {
        match self {
            Reply::Integer(value) => Ok(Some(value)),
            Reply::Nil => Ok(None),
            other => Err(other.mismatch("integer")),
        }
    }

    /// Integer flag replies (`EXPIRE`, `SISMEMBER`); true when equal to 1.
    pub fn into_bool(self) -> ClientResult<bool> {
        self.into_integer().map(|value| value == 1)
    }

    /// Floating point values travel as bulk text (`INCRBYFLOAT`, `ZSCORE`).
    pub fn into_opt_float(self) -> ClientResult<Option<f64>> {
        match self.into_opt_string()? {
            Some(text) => text
                .parse::<f64>()
                .map(Some)
                .map_err(|_| ClientError::UnexpectedResponse {
                    expected: "float",
                    found: "bulk",
                }),
            None => Ok(None),
        }
    }

    pub fn into_float(self) -> ClientResult<f64> {
        self.into_opt_float()?.ok_or(ClientError::UnexpectedResponse {
            expected: "float",
            found: "nil",
        })
    }

    pub fn into_array(self) -> ClientResult<Vec<Reply>> {
        match self {
            Reply::Array(items) => Ok(items),
            other => Err(other.mismatch("array")),
        }
    }

    /// Array that may be absent (`BLPOP` timing out).
    pub fn into_opt_array(self) -> ClientResult<Option<Vec<Reply>>> {
        match self {
            Reply::Array(items) => Ok(Some(items)),
            Reply::Nil => Ok(None),
            other => Err(other.mismatch("array")),
        }
    }

    /// Array of text elements (`KEYS`, `SMEMBERS`, `LRANGE`).
    pub fn into_string_vec(self) -> ClientResult<Vec<String>> {
        self.into_array()?
            .into_iter()
            .map(Reply::into_string)
            .collect()
    }

    /// Array of text elements where some may be nil (`MGET`, `HMGET`).
    pub fn into_opt_string_vec(self) -> ClientResult<Vec<Option<String>>> {
        self.into_array()?
            .into_iter()
            .map(Reply::into_opt_string)
            .collect()
    }

    fn mismatch(self, expected: &'static str) -> ClientError {
        match self {
            Reply::Error(message) => ClientError::Server { message },
            other => ClientError::UnexpectedResponse {
                expected,
                found: other.kind(),
            },
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(text) => write!(f, "{}", text),
            Reply::Bulk(text) => write!(f, "\"{}\"", text),
            Reply::Integer(value) => write!(f, "(integer) {}", value),
            Reply::Nil => write!(f, "(nil)"),
            Reply::Error(message) => write!(f, "(error) {}", message),
            Reply::Array(items) => {
                if items.is_empty() {
                    return write!(f, "(empty array)");
                }
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) {}", idx + 1, item)?;
                }
                Ok(())
            }
        }
    }
}

// Errors serialize as {"error": "..."} so JSON output keeps them apart from text.
impl Serialize for Reply {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reply::Status(text) | Reply::Bulk(text) => serializer.serialize_str(text),
            Reply::Integer(value) => serializer.serialize_i64(*value),
            Reply::Nil => serializer.serialize_none(),
            Reply::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Reply::Error(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}

/// A single command argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Text(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Text(text) => f.write_str(text),
            Arg::Int(value) => write!(f, "{}", value),
            Arg::Float(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Text(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Text(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Arg::Text(value.clone())
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Int(value as i64)
    }
}

impl From<u32> for Arg {
    fn from(value: u32) -> Self {
        Arg::Int(value as i64)
    }
}

impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        // Values above i64::MAX keep their exact decimal form.
        match i64::try_from(value) {
            Ok(value) => Arg::Int(value),
            Err(_) => Arg::Text(value.to_string()),
        }
    }
}

impl From<usize> for Arg {
    fn from(value: usize) -> Self {
        Arg::from(value as u64)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

/// A command name plus its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    name: String,
    args: Vec<Arg>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Command {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends every argument of the iterator in order.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub(crate) fn push(&mut self, arg: impl Into<Arg>) {
        self.args.push(arg.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[Arg] {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_reply_projects_to_server_error() {
        let err = Reply::Error("WRONGTYPE bad".to_string())
            .into_integer()
            .unwrap_err();
        match err {
            ClientError::Server { message } => assert_eq!(message, "WRONGTYPE bad"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn nil_is_distinct_from_text() {
        assert_eq!(Reply::Nil.into_opt_string().unwrap(), None);
        assert_eq!(
            Reply::Bulk("Nil".to_string()).into_opt_string().unwrap(),
            Some("Nil".to_string())
        );
    }

    #[test]
    fn shape_mismatch_reports_kinds() {
        let err = Reply::Integer(3).into_string_vec().unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnexpectedResponse {
                expected: "array",
                found: "integer"
            }
        ));
    }

    #[test]
    fn opt_string_vec_keeps_holes() {
        let reply = Reply::Array(vec![Reply::Bulk("a".to_string()), Reply::Nil]);
        assert_eq!(
            reply.into_opt_string_vec().unwrap(),
            vec![Some("a".to_string()), None]
        );
    }

    #[test]
    fn float_projection_parses_bulk() {
        assert_eq!(Reply::Bulk("10.5".to_string()).into_float().unwrap(), 10.5);
        assert!(Reply::Bulk("ten".to_string()).into_float().is_err());
    }

    #[test]
    fn command_stringifies_arguments() {
        let cmd = Command::new("expire").arg("key").arg(10).arg(1.5);
        let rendered: Vec<String> = cmd.arguments().iter().map(|a| a.to_string()).collect();
        assert_eq!(rendered, vec!["key", "10", "1.5"]);
    }

    #[test]
    fn replies_serialize_to_json() {
        let reply = Reply::Array(vec![
            Reply::Bulk("hello".to_string()),
            Reply::Integer(7),
            Reply::Nil,
            Reply::Error("ERR x".to_string()),
        ]);
        let json = serde_json::to_string(&reply).unwrap();
        assert_eq!(json, r#"["hello",7,null,{"error":"ERR x"}]"#);
    }
}
