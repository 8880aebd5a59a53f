//! # Subscriber
//!
//! Purpose: Receive published messages on a connection dedicated to a
//! subscription.
//!
//! ## Design Principles
//! 1. **Dedicated Connection**: A subscribed connection cannot serve normal
//!    commands, so it never returns to the pool.
//! 2. **Fire And Forget Control**: `SUBSCRIBE` and `UNSUBSCRIBE` are written
//!    without waiting; their acknowledgements arrive in-band and are skipped
//!    by `recv`.
//! 3. **Strict Frames**: Anything other than a three element array is a
//!    protocol violation and closes the connection.

use tracing::{debug, trace};

use crate::cmd;
use crate::conn::{Connection, Held, Stream};
use crate::error::{ClientError, ClientResult};
use crate::reply::{Arg, Command, Reply};

/// Frame kinds that acknowledge subscription changes instead of carrying data.
const CONTROL_KINDS: [&str; 3] = ["subscribe", "unsubscribe", "punsubscribe"];

/// One published message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub channel: String,
    pub payload: String,
}

/// Receiving end of a subscription.
pub struct Subscriber<S> {
    held: Held<S>,
}

impl<S: Stream> Subscriber<S> {
    pub(crate) async fn start(conn: Connection<S>, command: &Command) -> ClientResult<Self> {
        debug!(conn_id = conn.id(), channels = command.arguments().len(), "subscribing");
        let mut held = Held::new(conn);
        held.send(command).await?;
        Ok(Subscriber { held })
    }

    /// Waits for the next message and returns its payload.
    pub async fn recv(&mut self) -> ClientResult<String> {
        Ok(self.message().await?.payload)
    }

    /// Waits for the next message, skipping subscription acknowledgements.
    pub async fn message(&mut self) -> ClientResult<Message> {
        loop {
            let reply = self.held.recv().await?;
            match split_frame(reply) {
                Ok(Some(message)) => return Ok(message),
                Ok(None) => continue,
                Err(err) => {
                    self.held.fail(&err).await;
                    return Err(err);
                }
            }
        }
    }

    /// Requests removal of channels. The acknowledgement is skipped by `recv`.
    pub async fn unsubscribe<I, A>(&mut self, channels: I) -> ClientResult<()>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.held.send(&cmd::unsubscribe(channels)).await
    }

    /// Requests removal of patterns.
    pub async fn punsubscribe<I, A>(&mut self, patterns: I) -> ClientResult<()>
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.held.send(&cmd::punsubscribe(patterns)).await
    }

    pub fn is_open(&self) -> bool {
        self.held.is_open()
    }

    /// Shuts the connection down. Dropping the subscriber also closes it.
    pub async fn close(mut self) -> ClientResult<()> {
        self.held.close().await
    }
}

/// `Ok(None)` for control frames.
fn split_frame(reply: Reply) -> ClientResult<Option<Message>> {
    let items = match reply {
        Reply::Array(items) if items.len() == 3 => items,
        other => {
            return Err(ClientError::protocol(format!(
                "expected a 3 element subscription frame, got {}",
                describe(&other)
            )))
        }
    };
    let mut items = items.into_iter();
    let (Some(kind), Some(channel), Some(payload)) = (items.next(), items.next(), items.next()) else {
        return Err(ClientError::protocol("truncated subscription frame"));
    };

    let kind = element_text(kind)?;
    if CONTROL_KINDS.contains(&kind.as_str()) {
        trace!(kind = %kind, "skipping subscription control frame");
        return Ok(None);
    }
    Ok(Some(Message {
        channel: element_text(channel)?,
        payload: element_text(payload)?,
    }))
}

fn element_text(reply: Reply) -> ClientResult<String> {
    match reply {
        Reply::Status(text) | Reply::Bulk(text) => Ok(text),
        Reply::Integer(value) => Ok(value.to_string()),
        other => Err(ClientError::protocol(format!(
            "unexpected {} in subscription frame",
            other.kind()
        ))),
    }
}

fn describe(reply: &Reply) -> String {
    match reply {
        Reply::Array(items) => format!("array of {}", items.len()),
        other => other.kind().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resp::Codec;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn frame(kind: &str, channel: &str, payload: Reply) -> Reply {
        Reply::Array(vec![
            Reply::Bulk(kind.to_string()),
            Reply::Bulk(channel.to_string()),
            payload,
        ])
    }

    #[test]
    fn control_frames_are_skipped() {
        for kind in CONTROL_KINDS {
            assert_eq!(split_frame(frame(kind, "news", Reply::Integer(1))).unwrap(), None);
        }
    }

    #[test]
    fn message_frame_yields_channel_and_payload() {
        let message = split_frame(frame("message", "news", Reply::Bulk("hello".into())))
            .unwrap()
            .unwrap();
        assert_eq!(message.channel, "news");
        assert_eq!(message.payload, "hello");
    }

    #[test]
    fn wrong_shape_is_protocol_error() {
        let short = Reply::Array(vec![Reply::Bulk("message".into()), Reply::Bulk("news".into())]);
        assert!(matches!(split_frame(short), Err(ClientError::Protocol(_))));
        assert!(matches!(
            split_frame(Reply::Status("OK".into())),
            Err(ClientError::Protocol(_))
        ));
        let nested = frame("message", "news", Reply::Array(vec![]));
        assert!(matches!(split_frame(nested), Err(ClientError::Protocol(_))));
    }

    #[tokio::test]
    async fn recv_skips_ack_and_returns_payload() {
        let (client, mut server) = tokio::io::duplex(1024);
        let command = cmd::subscribe(["news"]);
        let mut subscriber = Subscriber::start(Connection::new(1, client, Codec::new()), &command)
            .await
            .unwrap();

        let request = Codec::new().encode(&command);
        let mut seen = vec![0u8; request.len()];
        server.read_exact(&mut seen).await.unwrap();
        assert_eq!(&seen[..], &request[..]);

        server
            .write_all(b"*3\r\n$9\r\nsubscribe\r\n$4\r\nnews\r\n:1\r\n*3\r\n$7\r\nmessage\r\n$4\r\nnews\r\n$5\r\nhello\r\n")
            .await
            .unwrap();
        assert_eq!(subscriber.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn malformed_frame_closes_subscriber() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut subscriber = Subscriber::start(
            Connection::new(2, client, Codec::new()),
            &cmd::subscribe(["news"]),
        )
        .await
        .unwrap();

        server.write_all(b"+OK\r\n").await.unwrap();
        assert!(matches!(subscriber.recv().await, Err(ClientError::Protocol(_))));
        assert!(!subscriber.is_open());
        assert!(matches!(subscriber.recv().await, Err(ClientError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn unsubscribe_sends_its_own_command_name() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut subscriber = Subscriber::start(
            Connection::new(3, client, Codec::new()),
            &cmd::subscribe(["news"]),
        )
        .await
        .unwrap();
        subscriber.unsubscribe(["news"]).await.unwrap();
        subscriber.close().await.unwrap();

        let mut written = Vec::new();
        server.read_to_end(&mut written).await.unwrap();
        let expected = [
            Codec::new().encode(&cmd::subscribe(["news"])),
            Codec::new().encode(&cmd::unsubscribe(["news"])),
        ]
        .concat();
        assert_eq!(written, expected);
    }
}
