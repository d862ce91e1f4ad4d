//! Sending replies to a client
//!
//! A Redis server replies to clients sending any valid RESP data type as reply.
//! Command handlers build a [`WireValue`] and hand it to the [`ReplyWriter`]
//! that owns the write half of the connection.
//!
//! # Examples
//!
//! The client sends the command LLEN mylist and the server replies with an integer
//! reply:
//!
//! ```terminal
//! client: "*2\r\n$4\r\nLLEN\r\n$6\r\nmylist\r\n" -- the request
//! server: ":48293\r\n"                       -- the reply
//! ```
use bytes::Bytes;
use miette::{IntoDiagnostic, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::value::WireValue;

#[derive(Debug)]
pub struct ReplyWriter<W> {
  sink: W,
}

impl<W> ReplyWriter<W>
where
  W: AsyncWrite + Unpin,
{
  pub fn new(sink: W) -> Self {
    Self { sink }
  }

  /// Encodes `value` and writes the whole frame.
  ///
  /// Error values are written like any other reply.
  pub async fn send(&mut self, value: &WireValue) -> Result<()> {
    trace!(reply = %value, error = value.is_error(), "sending reply");

    self.send_encoded(&value.to_bytes()).await
  }

  /// Writes a frame that was encoded once and is shared between connections.
  pub async fn send_encoded(&mut self, frame: &Bytes) -> Result<()> {
    trace!("sending RESP frame: {}", escape(frame));

    self.sink.write_all(frame).await.into_diagnostic()
  }

  pub async fn flush(&mut self) -> Result<()> {
    self.sink.flush().await.into_diagnostic()
  }

  pub fn into_inner(self) -> W {
    self.sink
  }
}

fn escape(frame: &[u8]) -> String {
  String::from_utf8_lossy(frame)
    .replace('\r', "\\r")
    .replace('\n', "\\n")
}
