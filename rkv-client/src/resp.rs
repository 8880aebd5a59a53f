//! # RESP2 Encoding and Parsing
//!
//! Purpose: Encode client commands as arrays of bulk strings and parse server
//! replies from a buffered async stream, one frame at a time.
//!
//! ## Design Principles
//! 1. **Value Codec**: `Codec` is a small `Copy` value with no mutable state;
//!    it is handed to the pool, never shared through a global.
//! 2. **Per-Connection Scratch**: Each `Connection` owns the line and write
//!    buffers passed in here, so steady-state roundtrips do not reallocate.
//! 3. **Exact Reads**: Bulk payloads are read with a byte-counted read, so a
//!    reply larger than one I/O buffer decodes correctly and the stream is
//!    left at the start of the next reply.
//! 4. **Poisoned Stream**: After a protocol error the stream position is
//!    unknown; callers close the connection rather than read on.
//! 5. **Bounded Bulks**: A bulk length above the codec's limit (512 MiB by
//!    default) is rejected before any payload is allocated.
//!
//! ## Frame Layout
//!
//! ```text
//! request:  *<N+1>\r\n $<len>\r\n<name>\r\n ( $<len>\r\n<arg>\r\n ){N}
//! replies:  +<status>\r\n  -<error>\r\n  :<int>\r\n
//!           $<len>\r\n<bytes>\r\n   ($-1\r\n is nil)
//!           *<count>\r\n<reply>{count}   (*-1\r\n is nil)
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::error::{ClientError, ClientResult};
use crate::reply::{Arg, Command, Reply};

/// Default cap on an announced bulk length (512 MiB, the server's own limit).
pub const DEFAULT_MAX_BULK_LEN: u64 = 512 * 1024 * 1024;

/// What to do with an error element found inside an array reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayErrors {
    /// Skip the element; the array comes back shorter than announced.
    #[default]
    Drop,
    /// Keep the element in place as `Reply::Error`.
    Keep,
}

/// Stateless RESP2 encoder/decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    array_errors: ArrayErrors,
    max_bulk_len: u64,
}

impl Default for Codec {
    fn default() -> Self {
        Codec {
            array_errors: ArrayErrors::Drop,
            max_bulk_len: DEFAULT_MAX_BULK_LEN,
        }
    }
}

struct OpenArray {
    remaining: usize,
    items: Vec<Reply>,
}

enum Frame {
    Value(Reply),
    ArrayStart(usize),
}

impl Codec {
    pub fn new() -> Self {
        Codec::default()
    }

    pub fn with_array_errors(mut self, policy: ArrayErrors) -> Self {
        self.array_errors = policy;
        self
    }

    pub fn array_errors(&self) -> ArrayErrors {
        self.array_errors
    }

    /// Rejects bulk replies announcing more than `limit` bytes.
    pub fn with_max_bulk_len(mut self, limit: u64) -> Self {
        self.max_bulk_len = limit;
        self
    }

    pub fn max_bulk_len(&self) -> u64 {
        self.max_bulk_len
    }

    /// Encodes a command into a fresh buffer.
    pub fn encode(&self, command: &Command) -> Bytes {
        let mut out = BytesMut::with_capacity(64);
        self.encode_into(command, &mut out);
        out.freeze()
    }

    /// Encodes a command as a RESP2 array of bulk strings into `out`.
    pub fn encode_into(&self, command: &Command, out: &mut BytesMut) {
        out.put_u8(b'*');
        push_usize(out, command.arguments().len() + 1);
        out.put_slice(b"\r\n");
        put_bulk(out, command.name().as_bytes());
        for arg in command.arguments() {
            match arg {
                Arg::Text(text) => put_bulk(out, text.as_bytes()),
                other => put_bulk(out, other.to_string().as_bytes()),
            }
        }
    }

    /// Encodes a command, writes it and flushes the writer.
    pub async fn encode_to<W>(&self, writer: &mut W, command: &Command, buf: &mut BytesMut) -> ClientResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        buf.clear();
        self.encode_into(command, buf);
        writer.write_all(buf).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Reads exactly one reply from the buffered reader.
    ///
    /// Nested arrays are assembled with an explicit stack, so the nesting
    /// depth is bounded only by memory.
    pub async fn decode<R>(&self, reader: &mut R, line_buf: &mut Vec<u8>) -> ClientResult<Reply>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stack: Vec<OpenArray> = Vec::new();
        loop {
            let mut value = match read_frame(reader, line_buf, self.max_bulk_len).await? {
                Frame::Value(reply) => reply,
                Frame::ArrayStart(len) => {
                    stack.push(OpenArray {
                        remaining: len,
                        items: Vec::with_capacity(len.min(1024)),
                    });
                    continue;
                }
            };

            // Attach the value to its parent, closing every array it completes.
            loop {
                let Some(top) = stack.last_mut() else {
                    return Ok(value);
                };
                self.push_element(&mut top.items, value);
                top.remaining -= 1;
                if top.remaining > 0 {
                    break;
                }
                let items = stack.pop().map(|open| open.items).unwrap_or_default();
                value = Reply::Array(items);
            }
        }
    }

    fn push_element(&self, items: &mut Vec<Reply>, value: Reply) {
        match (value, self.array_errors) {
            (Reply::Error(message), ArrayErrors::Drop) => {
                warn!(error = %message, position = items.len(), "dropping error element from array reply");
            }
            (value, _) => items.push(value),
        }
    }
}

async fn read_frame<R>(reader: &mut R, line_buf: &mut Vec<u8>, max_bulk_len: u64) -> ClientResult<Frame>
where
    R: AsyncBufRead + Unpin,
{
    read_line(reader, line_buf).await?;
    if line_buf.is_empty() {
        return Err(ClientError::protocol("empty reply line"));
    }

    let frame = match line_buf[0] {
        b'+' => Frame::Value(Reply::Status(into_text(line_buf[1..].to_vec()))),
        b'-' => Frame::Value(Reply::Error(into_text(line_buf[1..].to_vec()))),
        b':' => Frame::Value(Reply::Integer(parse_i64(&line_buf[1..])?)),
        b'$' => {
            let len = parse_i64(&line_buf[1..])?;
            Frame::Value(read_bulk(reader, len, max_bulk_len).await?)
        }
        b'*' => {
            let len = parse_i64(&line_buf[1..])?;
            match len {
                len if len < 0 => Frame::Value(Reply::Nil),
                0 => Frame::Value(Reply::Array(Vec::new())),
                len => Frame::ArrayStart(len as usize),
            }
        }
        tag => {
            return Err(ClientError::protocol(format!(
                "unsupported reply type {:?}",
                tag as char
            )))
        }
    };
    Ok(frame)
}

async fn read_bulk<R>(reader: &mut R, len: i64, max_bulk_len: u64) -> ClientResult<Reply>
where
    R: AsyncBufRead + Unpin,
{
    if len < 0 {
        return Ok(Reply::Nil);
    }
    if len as u64 > max_bulk_len {
        return Err(ClientError::protocol(format!(
            "bulk length {} exceeds limit {}",
            len, max_bulk_len
        )));
    }

    // Payload plus trailing CRLF.
    let len = len as usize;
    let mut data = vec![0u8; len + 2];
    reader.read_exact(&mut data).await?;
    if &data[len..] != b"\r\n" {
        return Err(ClientError::protocol("bulk payload not terminated by CRLF"));
    }
    data.truncate(len);
    Ok(Reply::Bulk(into_text(data)))
}

async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> ClientResult<()>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let bytes = reader.read_until(b'\n', buf).await?;
    if bytes == 0 {
        return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "connection closed by peer").into());
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(ClientError::protocol("reply line not terminated by CRLF"));
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn into_text(data: Vec<u8>) -> String {
    match String::from_utf8(data) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    let invalid = || ClientError::protocol(format!("invalid integer {:?}", String::from_utf8_lossy(data)));
    if data.is_empty() {
        return Err(invalid());
    }
    let (negative, digits) = match data[0] {
        b'-' => (true, &data[1..]),
        _ => (false, data),
    };
    if digits.is_empty() {
        return Err(invalid());
    }

    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(invalid());
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((b - b'0') as i64))
            .ok_or_else(invalid)?;
    }

    if negative {
        Ok(-value)
    } else {
        Ok(value)
    }
}

fn put_bulk(out: &mut BytesMut, data: &[u8]) {
    out.put_u8(b'$');
    push_usize(out, data.len());
    out.put_slice(b"\r\n");
    out.put_slice(data);
    out.put_slice(b"\r\n");
}

fn push_usize(out: &mut BytesMut, mut value: usize) {
    // Write digits into a small stack buffer to avoid heap allocations.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    } else {
        while value > 0 {
            buf[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
    }
    buf[..len].reverse();
    out.put_slice(&buf[..len]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn decode_bytes(codec: Codec, input: &[u8]) -> ClientResult<Reply> {
        let mut reader = input;
        let mut line = Vec::new();
        codec.decode(&mut reader, &mut line).await
    }

    #[test]
    fn encodes_command() {
        let cmd = Command::new("set").arg("hello").arg("world");
        let buf = Codec::new().encode(&cmd);
        assert_eq!(&buf[..], b"*3\r\n$3\r\nset\r\n$5\r\nhello\r\n$5\r\nworld\r\n");
    }

    #[test]
    fn encodes_numbers_and_multibyte_text() {
        let cmd = Command::new("expire").arg("ключ").arg(120);
        let buf = Codec::new().encode(&cmd);
        assert_eq!(
            &buf[..],
            "*3\r\n$6\r\nexpire\r\n$8\r\nключ\r\n$3\r\n120\r\n".as_bytes()
        );
    }

    #[test]
    fn encodes_command_without_arguments() {
        let buf = Codec::new().encode(&Command::new("ping"));
        assert_eq!(&buf[..], b"*1\r\n$4\r\nping\r\n");
    }

    #[tokio::test]
    async fn encode_to_writes_and_flushes() {
        let mut out: Vec<u8> = Vec::new();
        let mut scratch = BytesMut::new();
        let cmd = Command::new("get").arg("key");
        Codec::new().encode_to(&mut out, &cmd, &mut scratch).await.unwrap();
        assert_eq!(out, b"*2\r\n$3\r\nget\r\n$3\r\nkey\r\n");
    }

    #[tokio::test]
    async fn parses_status() {
        let resp = decode_bytes(Codec::new(), b"+OK\r\n").await.unwrap();
        assert_eq!(resp, Reply::Status("OK".to_string()));
    }

    #[tokio::test]
    async fn parses_error() {
        let resp = decode_bytes(Codec::new(), b"-ERR bad\r\n").await.unwrap();
        assert_eq!(resp, Reply::Error("ERR bad".to_string()));
    }

    #[tokio::test]
    async fn parses_integer() {
        let resp = decode_bytes(Codec::new(), b":-42\r\n").await.unwrap();
        assert_eq!(resp, Reply::Integer(-42));
    }

    #[tokio::test]
    async fn parses_bulk_string() {
        let resp = decode_bytes(Codec::new(), b"$5\r\nhello\r\n").await.unwrap();
        assert_eq!(resp, Reply::Bulk("hello".to_string()));
    }

    #[tokio::test]
    async fn parses_empty_bulk_string() {
        let resp = decode_bytes(Codec::new(), b"$0\r\n\r\n").await.unwrap();
        assert_eq!(resp, Reply::Bulk(String::new()));
    }

    #[tokio::test]
    async fn parses_null_bulk_and_null_array() {
        assert_eq!(decode_bytes(Codec::new(), b"$-1\r\n").await.unwrap(), Reply::Nil);
        assert_eq!(decode_bytes(Codec::new(), b"*-1\r\n").await.unwrap(), Reply::Nil);
    }

    #[tokio::test]
    async fn parses_mixed_array() {
        let resp = decode_bytes(Codec::new(), b"*2\r\n$5\r\nhello\r\n:7\r\n").await.unwrap();
        assert_eq!(
            resp,
            Reply::Array(vec![Reply::Bulk("hello".to_string()), Reply::Integer(7)])
        );
    }

    #[tokio::test]
    async fn parses_nested_arrays() {
        let input = b"*3\r\n*2\r\n+a\r\n*0\r\n:1\r\n*1\r\n$-1\r\n";
        let resp = decode_bytes(Codec::new(), input).await.unwrap();
        assert_eq!(
            resp,
            Reply::Array(vec![
                Reply::Array(vec![Reply::Status("a".to_string()), Reply::Array(vec![])]),
                Reply::Integer(1),
                Reply::Array(vec![Reply::Nil]),
            ])
        );
    }

    #[tokio::test]
    async fn drops_error_elements_by_default() {
        let input = b"*3\r\n:1\r\n-ERR inner\r\n:2\r\n";
        let resp = decode_bytes(Codec::new(), input).await.unwrap();
        assert_eq!(resp, Reply::Array(vec![Reply::Integer(1), Reply::Integer(2)]));
    }

    #[tokio::test]
    async fn keeps_error_elements_when_configured() {
        let input = b"*2\r\n-ERR inner\r\n:2\r\n";
        let codec = Codec::new().with_array_errors(ArrayErrors::Keep);
        let resp = decode_bytes(codec, input).await.unwrap();
        assert_eq!(
            resp,
            Reply::Array(vec![Reply::Error("ERR inner".to_string()), Reply::Integer(2)])
        );
    }

    #[tokio::test]
    async fn array_of_only_errors_is_empty_when_dropped() {
        let resp = decode_bytes(Codec::new(), b"*1\r\n-ERR x\r\n").await.unwrap();
        assert_eq!(resp, Reply::Array(vec![]));
    }

    #[tokio::test]
    async fn consecutive_decodes_consume_one_reply_each() {
        let mut reader: &[u8] = b"+OK\r\n+PONG\r\n$3\r\nend\r\n";
        let mut line = Vec::new();
        let codec = Codec::new();
        assert_eq!(
            codec.decode(&mut reader, &mut line).await.unwrap(),
            Reply::Status("OK".to_string())
        );
        assert_eq!(
            codec.decode(&mut reader, &mut line).await.unwrap(),
            Reply::Status("PONG".to_string())
        );
        assert_eq!(
            codec.decode(&mut reader, &mut line).await.unwrap(),
            Reply::Bulk("end".to_string())
        );
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn decodes_replies_delivered_in_small_chunks() {
        let payload = "x".repeat(10_000);
        let mut wire = format!("*2\r\n${}\r\n{}\r\n:9\r\n", payload.len(), payload).into_bytes();
        wire.extend_from_slice(b"+NEXT\r\n");

        let (client, mut server) = tokio::io::duplex(7);
        tokio::spawn(async move {
            for chunk in wire.chunks(5) {
                server.write_all(chunk).await.unwrap();
            }
        });

        let mut reader = BufReader::with_capacity(16, client);
        let mut line = Vec::new();
        let codec = Codec::new();
        let resp = codec.decode(&mut reader, &mut line).await.unwrap();
        assert_eq!(resp, Reply::Array(vec![Reply::Bulk(payload), Reply::Integer(9)]));
        let next = codec.decode(&mut reader, &mut line).await.unwrap();
        assert_eq!(next, Reply::Status("NEXT".to_string()));
    }

    #[tokio::test]
    async fn rejects_unknown_type_tag() {
        let err = decode_bytes(Codec::new(), b"?what\r\n").await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[tokio::test]
    async fn rejects_malformed_lengths() {
        let inputs: [&[u8]; 5] = [b"$abc\r\n", b"*x\r\n", b":12a\r\n", b"$-\r\n", b":\r\n"];
        for input in inputs {
            let err = decode_bytes(Codec::new(), input).await.unwrap_err();
            assert!(matches!(err, ClientError::Protocol(_)), "input {:?}", input);
        }
    }

    #[tokio::test]
    async fn rejects_missing_crlf() {
        let err = decode_bytes(Codec::new(), b"+OK\n").await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
        let err = decode_bytes(Codec::new(), b"$2\r\nokXX").await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[tokio::test]
    async fn eof_mid_frame_is_io_error() {
        let err = decode_bytes(Codec::new(), b"*2\r\n:1\r\n").await.unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
        let err = decode_bytes(Codec::new(), b"$10\r\nshort").await.unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }

    #[tokio::test]
    async fn bulk_over_limit_is_rejected_before_reading() {
        let codec = Codec::new().with_max_bulk_len(4);
        let resp = decode_bytes(codec, b"$4\r\nabcd\r\n").await.unwrap();
        assert_eq!(resp, Reply::Bulk("abcd".to_string()));

        // The payload is never read, so a truncated body still reports the limit.
        let err = decode_bytes(codec, b"$5\r\nab").await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(ref msg) if msg.contains("exceeds limit")));
        assert_eq!(Codec::new().max_bulk_len(), DEFAULT_MAX_BULK_LEN);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let resp = decode_bytes(Codec::new(), b"$2\r\n\xff\x41\r\n").await.unwrap();
        assert_eq!(resp, Reply::Bulk("\u{fffd}A".to_string()));
    }
}
