//! RESP is actually a serialization protocol that supports the following data types: Simple Strings, Errors, Integers, Bulk Strings and Arrays.
//!
//! Every reply this server sends is a [`WireValue`]. A value is built once by one of
//! the factories below and never mutated afterwards, so the same value can be encoded
//! by any number of connections at the same time.
//!
//! In RESP different parts of the protocol are always terminated with
//! "\r\n" (CRLF).
use bytes::{BufMut, Bytes, BytesMut};
use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// Terminates every line of the protocol.
pub const CRLF: &[u8] = b"\r\n";

/// A Bulk String with no value.
pub const NIL: &[u8] = b"$-1\r\n";

#[derive(Debug, PartialEq, Eq, Diagnostic, Error)]
pub enum ValueError {
  #[error("{kind} payload contains {byte} at position {position}")]
  #[diagnostic(help("CR and LF break RESP framing, send the payload as a bulk string instead"))]
  ForbiddenByte {
    kind: &'static str,
    byte: &'static str,
    position: usize,
  },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
  /// When the first byte of the data is "+"
  ///
  /// Simple Strings are used to transmit non binary safe strings with minimal overhead.
  /// The payload must not contain CR or LF.
  ///
  /// # Examples
  ///
  /// ```terminal
  /// "+OK\r\n"
  /// ```
  SimpleString(String),
  /// When the first byte of the data is "-"
  ///
  /// Errors are replies like any other, the client decides what to do with them.
  ///
  /// # Examples
  ///
  /// ```terminal
  /// "-ERR unknown command 'foobar'\r\n"
  /// ```
  Error(String),
  /// When the first byte of the data is ":"
  ///
  /// # Examples
  ///
  /// ```terminal
  /// ":0\r\n"
  /// ":-7\r\n"
  /// ```
  Int(i64),
  /// When the first byte of the data is "$"
  ///
  /// A "$" byte followed by the number of bytes composing the string (a prefixed length), terminated by CRLF.
  /// The actual string data.
  /// A final CRLF.
  ///
  /// `None` is the Null Bulk String, which is not the same thing as the empty string.
  ///
  /// # Examples
  ///
  /// ```terminal
  /// "$6\r\nfoobar\r\n"
  /// "$0\r\n\r\n"
  /// "$-1\r\n"
  /// ```
  Bulk(Option<Bytes>),
  /// When the first byte of the data is "*"
  ///
  /// A * character as the first byte, followed by the number of elements in the array as a decimal number, followed by CRLF.
  /// An additional RESP type for every element of the Array.
  ///
  /// # Examples
  ///
  /// ```terminal
  /// "*0\r\n"
  /// "*2\r\n$1\r\na\r\n:1\r\n"
  /// ```
  Array(Vec<WireValue>),
}

impl WireValue {
  pub fn simple_string(text: impl Into<String>) -> Self {
    WireValue::SimpleString(text.into())
  }

  /// Like [`WireValue::simple_string`] but refuses payloads containing CR or LF.
  pub fn try_simple_string(text: impl Into<String>) -> Result<Self, ValueError> {
    let text = text.into();
    check_line("simple string", &text)?;
    Ok(WireValue::SimpleString(text))
  }

  pub fn bulk(data: impl Into<Bytes>) -> Self {
    WireValue::Bulk(Some(data.into()))
  }

  pub fn bulk_opt(data: Option<impl Into<Bytes>>) -> Self {
    WireValue::Bulk(data.map(Into::into))
  }

  /// The Null Bulk String.
  pub fn nil() -> Self {
    WireValue::Bulk(None)
  }

  pub fn int(n: i64) -> Self {
    WireValue::Int(n)
  }

  /// Builds an error message by concatenating `fragments`, no separator is inserted.
  pub fn error<I, S>(fragments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let message = fragments
      .into_iter()
      .fold(String::new(), |mut message, fragment| {
        message.push_str(fragment.as_ref());
        message
      });

    WireValue::Error(message)
  }

  /// Like [`WireValue::error`] but refuses messages containing CR or LF.
  pub fn try_error<I, S>(fragments: I) -> Result<Self, ValueError>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let value = Self::error(fragments);

    if let WireValue::Error(message) = &value {
      check_line("error", message)?;
    }

    Ok(value)
  }

  pub fn array(values: Vec<WireValue>) -> Self {
    WireValue::Array(values)
  }

  /// Deployed clients match on this exact text, typos included.
  pub fn wrong_number_of_args(command: &str) -> Self {
    WireValue::Error(format!(
      "Ero wrong number of arguments for {} command",
      command
    ))
  }

  /// Deployed clients match on this exact text, typos included.
  pub fn wrong_type() -> Self {
    WireValue::Error(String::from(
      "Wrong type operation aginst a key holding the wrong kind of value",
    ))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, WireValue::Error(_))
  }

  pub fn is_nil(&self) -> bool {
    matches!(self, WireValue::Bulk(None))
  }

  /// Returns the complete frame for this value.
  pub fn to_bytes(&self) -> Bytes {
    let mut buffer = BytesMut::new();
    self.encode_into(&mut buffer);
    buffer.freeze()
  }

  /// Appends the complete frame for this value to `buffer`.
  ///
  /// Arrays write their header and then let every element encode itself,
  /// each element already ends with its own CRLF.
  pub fn encode_into(&self, buffer: &mut BytesMut) {
    match self {
      WireValue::SimpleString(text) => {
        buffer.put_u8(b'+');
        buffer.extend_from_slice(text.as_bytes());
        buffer.extend_from_slice(CRLF);
      }
      WireValue::Error(message) => {
        buffer.put_u8(b'-');
        buffer.extend_from_slice(message.as_bytes());
        buffer.extend_from_slice(CRLF);
      }
      WireValue::Int(n) => {
        buffer.put_u8(b':');
        buffer.extend_from_slice(n.to_string().as_bytes());
        buffer.extend_from_slice(CRLF);
      }
      WireValue::Bulk(None) => buffer.extend_from_slice(NIL),
      WireValue::Bulk(Some(data)) => {
        buffer.put_u8(b'$');
        buffer.extend_from_slice(data.len().to_string().as_bytes());
        buffer.extend_from_slice(CRLF);
        buffer.extend_from_slice(data);
        buffer.extend_from_slice(CRLF);
      }
      WireValue::Array(values) => {
        buffer.put_u8(b'*');
        buffer.extend_from_slice(values.len().to_string().as_bytes());
        buffer.extend_from_slice(CRLF);

        for value in values {
          value.encode_into(buffer);
        }
      }
    }
  }

  /// Returns the payload without any framing.
  ///
  /// The Null Bulk String has no payload and returns an empty buffer.
  pub fn byte_data(&self) -> Bytes {
    match self {
      WireValue::SimpleString(text) | WireValue::Error(text) => {
        Bytes::copy_from_slice(text.as_bytes())
      }
      WireValue::Int(n) => Bytes::from(n.to_string()),
      WireValue::Bulk(data) => data.clone().unwrap_or_default(),
      WireValue::Array(values) => {
        let mut buffer = BytesMut::new();

        for value in values {
          buffer.extend_from_slice(&value.byte_data());
        }

        buffer.freeze()
      }
    }
  }
}

/// Human readable rendering, meant for logs. Not a wire format.
impl fmt::Display for WireValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WireValue::SimpleString(text) | WireValue::Error(text) => f.write_str(text),
      WireValue::Int(n) => write!(f, "{}", n),
      WireValue::Bulk(None) => Ok(()),
      WireValue::Bulk(Some(data)) => f.write_str(&String::from_utf8_lossy(data)),
      WireValue::Array(values) => {
        for (i, value) in values.iter().enumerate() {
          if i > 0 {
            f.write_str(" ")?;
          }
          write!(f, "{}", value)?;
        }

        Ok(())
      }
    }
  }
}

fn check_line(kind: &'static str, text: &str) -> Result<(), ValueError> {
  match text.bytes().position(|byte| byte == b'\r' || byte == b'\n') {
    None => Ok(()),
    Some(position) => Err(ValueError::ForbiddenByte {
      kind,
      byte: if text.as_bytes()[position] == b'\r' { "CR" } else { "LF" },
      position,
    }),
  }
}
