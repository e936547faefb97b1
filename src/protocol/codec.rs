//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! *<count>\r\n<value>...          Array
//! $<len>\r\n<len raw bytes>\r\n   Bulk string ($-1\r\n is Null)
//! +<text>\r\n                     Simple string
//! -<text>\r\n                     Error
//! :<number>\r\n                   Integer
//! ```
//!
//! Simple strings and errors are single lines: any CR or LF inside them is
//! written as a space.
//!
//! The request decoder accepts only `*` and `$`. Clients use
//! [`RespReader::for_replies`] to read the full reply surface.

use std::io::{self, BufRead, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{EmberError, Result};
use super::Value;

pub const SIMPLE_STRING: u8 = b'+';
pub const ERROR: u8 = b'-';
pub const INTEGER: u8 = b':';
pub const BULK: u8 = b'$';
pub const ARRAY: u8 = b'*';

const CRLF: &[u8; 2] = b"\r\n";

/// Longest length/simple-string line the decoder will buffer
pub const MAX_LINE_LEN: u64 = 64 * 1024;

/// Default nesting limit for Arrays
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Default bulk payload limit (512 MB)
pub const DEFAULT_MAX_BULK_LEN: usize = 512 * 1024 * 1024;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a value to bytes
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(64);
    encode_into(value, &mut buf);
    buf.to_vec()
}

/// Append the encoding of `value` to `buf`
pub fn encode_into(value: &Value, buf: &mut BytesMut) {
    match value {
        Value::SimpleString(text) => put_text_line(buf, SIMPLE_STRING, text),
        Value::Error(text) => put_text_line(buf, ERROR, text),
        Value::Integer(n) => put_line(buf, INTEGER, n.to_string().as_bytes()),
        Value::Bulk(data) => {
            put_line(buf, BULK, data.len().to_string().as_bytes());
            buf.reserve(data.len() + CRLF.len());
            buf.put_slice(data);
            buf.put_slice(CRLF);
        }
        Value::Null => buf.put_slice(b"$-1\r\n"),
        Value::Array(items) => {
            put_line(buf, ARRAY, items.len().to_string().as_bytes());
            for item in items {
                encode_into(item, buf);
            }
        }
    }
}

fn put_line(buf: &mut BytesMut, type_byte: u8, body: &[u8]) {
    buf.reserve(1 + body.len() + CRLF.len());
    buf.put_u8(type_byte);
    buf.put_slice(body);
    buf.put_slice(CRLF);
}

/// Line-typed text must not carry its own terminator; CR and LF become spaces
fn put_text_line(buf: &mut BytesMut, type_byte: u8, text: &str) {
    if text.bytes().any(|b| b == b'\r' || b == b'\n') {
        let flat: String = text
            .chars()
            .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
            .collect();
        put_line(buf, type_byte, flat.as_bytes());
    } else {
        put_line(buf, type_byte, text.as_bytes());
    }
}

/// Write a value to a stream and flush it
pub fn write_value<W: Write>(writer: &mut W, value: &Value) -> Result<()> {
    let bytes = encode(value);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Which type bytes the reader accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    /// Arrays and bulk strings only (server side)
    Request,
    /// Every type byte (client side)
    Reply,
}

/// Streaming decoder over a buffered reader
///
/// Each call to [`RespReader::read_value`] consumes exactly one value.
pub struct RespReader<R> {
    reader: R,
    surface: Surface,
    max_depth: usize,
    max_bulk_len: usize,
}

impl<R: BufRead> RespReader<R> {
    /// Create a request decoder with default limits
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            surface: Surface::Request,
            max_depth: DEFAULT_MAX_DEPTH,
            max_bulk_len: DEFAULT_MAX_BULK_LEN,
        }
    }

    /// Create a decoder that also accepts `+`, `-` and `:` values
    pub fn for_replies(reader: R) -> Self {
        Self {
            surface: Surface::Reply,
            ..Self::new(reader)
        }
    }

    /// Override the Array nesting limit
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Override the bulk payload limit
    pub fn with_max_bulk_len(mut self, len: usize) -> Self {
        self.max_bulk_len = len;
        self
    }

    /// Access the underlying reader
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Decode the next top-level value
    ///
    /// Returns `Ok(None)` when the stream ends cleanly before a new value
    /// starts. Running out of bytes inside a value is a protocol error.
    pub fn read_value(&mut self) -> Result<Option<Value>> {
        let type_byte = loop {
            let mut byte = [0u8; 1];
            match self.reader.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => break byte[0],
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        self.decode_body(type_byte, 0).map(Some)
    }

    fn decode_nested(&mut self, depth: usize) -> Result<Value> {
        let mut byte = [0u8; 1];
        self.read_exact(&mut byte, "type byte")?;
        self.decode_body(byte[0], depth)
    }

    fn decode_body(&mut self, type_byte: u8, depth: usize) -> Result<Value> {
        match type_byte {
            ARRAY => self.decode_array(depth),
            BULK => self.decode_bulk(),
            SIMPLE_STRING | ERROR | INTEGER if self.surface == Surface::Reply => {
                let line = self.read_line()?;
                let text = String::from_utf8(line)
                    .map_err(|_| EmberError::Protocol("line is not valid UTF-8".to_string()))?;
                match type_byte {
                    SIMPLE_STRING => Ok(Value::SimpleString(text)),
                    ERROR => Ok(Value::Error(text)),
                    _ => text.parse().map(Value::Integer).map_err(|_| {
                        EmberError::Protocol(format!("invalid integer '{}'", text))
                    }),
                }
            }
            other => Err(EmberError::Protocol(format!(
                "unsupported type byte '{}'",
                (other as char).escape_default()
            ))),
        }
    }

    fn decode_array(&mut self, depth: usize) -> Result<Value> {
        if depth >= self.max_depth {
            return Err(EmberError::Protocol(format!(
                "array nesting exceeds {} levels",
                self.max_depth
            )));
        }

        let len = self.read_length()?;
        if len < 0 {
            return Ok(Value::Null);
        }

        // Cap the up-front allocation; the declared count is untrusted.
        let mut items = Vec::with_capacity((len as usize).min(1024));
        for _ in 0..len {
            items.push(self.decode_nested(depth + 1)?);
        }
        Ok(Value::Array(items))
    }

    fn decode_bulk(&mut self) -> Result<Value> {
        let len = self.read_length()?;
        if len < 0 {
            return Ok(Value::Null);
        }

        let len = len as usize;
        if len > self.max_bulk_len {
            return Err(EmberError::Protocol(format!(
                "bulk string too large: {} bytes (max {})",
                len, self.max_bulk_len
            )));
        }

        let mut payload = vec![0u8; len];
        self.read_exact(&mut payload, "bulk payload")?;

        let mut terminator = [0u8; 2];
        self.read_exact(&mut terminator, "bulk terminator")?;
        if &terminator != CRLF {
            return Err(EmberError::Protocol(
                "bulk string not terminated by CRLF".to_string(),
            ));
        }

        Ok(Value::Bulk(Bytes::from(payload)))
    }

    /// Read a CRLF-terminated line, returning it without the terminator
    fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        let read = (&mut self.reader)
            .take(MAX_LINE_LEN)
            .read_until(b'\n', &mut line)?;

        if read == 0 || line.last() != Some(&b'\n') {
            if read as u64 >= MAX_LINE_LEN {
                return Err(EmberError::Protocol("line too long".to_string()));
            }
            return Err(EmberError::Protocol(
                "unexpected end of stream inside a value".to_string(),
            ));
        }
        if line.len() < 2 || line[line.len() - 2] != b'\r' {
            return Err(EmberError::Protocol(
                "line not terminated by CRLF".to_string(),
            ));
        }

        line.truncate(line.len() - 2);
        Ok(line)
    }

    fn read_length(&mut self) -> Result<i64> {
        let line = self.read_line()?;
        std::str::from_utf8(&line)
            .ok()
            .filter(|text| !text.is_empty() && !text.starts_with('+'))
            .and_then(|text| text.parse::<i64>().ok())
            .ok_or_else(|| {
                EmberError::Protocol(format!(
                    "invalid length '{}'",
                    String::from_utf8_lossy(&line)
                ))
            })
    }

    fn read_exact(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        self.reader.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                EmberError::Protocol(format!("unexpected end of stream reading {}", what))
            }
            _ => EmberError::Io(e),
        })
    }
}

/// Decode exactly one request value from a byte slice
///
/// Trailing bytes after the first value are ignored.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    RespReader::new(bytes)
        .read_value()?
        .ok_or_else(|| EmberError::Protocol("empty input".to_string()))
}

/// Read one reply from a stream (client side)
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Value> {
    RespReader::for_replies(reader)
        .read_value()?
        .ok_or_else(|| EmberError::Network("connection closed by server".to_string()))
}
