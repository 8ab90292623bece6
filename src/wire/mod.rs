use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::{Decoder, Encoder, Framed, LengthDelimitedCodec};

/// Errors raised while framing or deframing control-channel messages
#[derive(Debug, Error)]
pub enum WireError {
    #[error("i/o failure on control channel: {0}")]
    Io(#[from] std::io::Error),

    #[error("control message is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("timed out after {0:?} waiting for a control message")]
    Timeout(Duration),
}

/// Codec for control-channel messages: a 4-byte big-endian length prefix
/// followed by a UTF-8 payload. One frame is one logical message, however
/// many reads it takes to arrive.
#[derive(Debug)]
pub struct TextCodec {
    length_codec: LengthDelimitedCodec,
}

impl TextCodec {
    pub fn new() -> Self {
        Self {
            length_codec: LengthDelimitedCodec::new(),
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TextCodec {
    type Item = String;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.length_codec.decode(src)? else {
            return Ok(None);
        };

        String::from_utf8(frame.to_vec())
            .map(Some)
            .map_err(WireError::Utf8)
    }
}

impl Encoder<String> for TextCodec {
    type Error = WireError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.length_codec
            .encode(Bytes::from(item.into_bytes()), dst)
            .map_err(WireError::Io)
    }
}

/// A control channel carrying framed text messages.
pub type MessageStream<T> = Framed<T, TextCodec>;

/// Wrap a transport (typically a `TcpStream`) in the message codec.
pub fn framed<T>(io: T) -> MessageStream<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    Framed::new(io, TextCodec::new())
}

/// Send one message and flush it.
pub async fn send_message<T>(
    stream: &mut MessageStream<T>,
    message: impl Into<String>,
) -> Result<(), WireError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    stream.send(message.into()).await
}

/// Receive the next message. `Ok(None)` means the peer closed the channel.
pub async fn recv_message<T>(stream: &mut MessageStream<T>) -> Result<Option<String>, WireError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    stream.next().await.transpose()
}

/// Receive the next message, bounded by an optional idle limit. `None`
/// preserves the protocol's block-forever contract.
pub async fn recv_message_within<T>(
    stream: &mut MessageStream<T>,
    limit: Option<Duration>,
) -> Result<Option<String>, WireError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    match limit {
        Some(duration) => timeout(duration, recv_message(stream))
            .await
            .map_err(|_| WireError::Timeout(duration))?,
        None => recv_message(stream).await,
    }
}
