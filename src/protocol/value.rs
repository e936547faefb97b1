//! Value definitions
//!
//! The recursive value tree carried by requests and replies.

use bytes::Bytes;

/// A single protocol value
///
/// Requests only ever decode to `Array`, `Bulk` and `Null`. `SimpleString`,
/// `Error` and `Integer` exist so handlers can build replies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `+text\r\n`
    SimpleString(String),

    /// `-text\r\n`
    Error(String),

    /// `:number\r\n`
    Integer(i64),

    /// `$len\r\n<bytes>\r\n`, binary-safe
    Bulk(Bytes),

    /// `$-1\r\n`, the "no value" state of a bulk string
    Null,

    /// `*count\r\n` followed by `count` encoded values
    Array(Vec<Value>),
}

impl Value {
    /// The `+OK` reply
    pub fn ok() -> Self {
        Value::SimpleString("OK".to_string())
    }

    /// Create a simple string reply
    pub fn simple(text: impl Into<String>) -> Self {
        Value::SimpleString(text.into())
    }

    /// Create an error reply
    pub fn error(message: impl Into<String>) -> Self {
        Value::Error(message.into())
    }

    /// Create a bulk string
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Value::Bulk(data.into())
    }

    /// Build a request: an Array of bulk strings, command name first
    ///
    /// ```
    /// use emberkv::protocol::Value;
    ///
    /// let request = Value::command(["SET", "name", "Ahmed"]);
    /// assert_eq!(request.as_array().map(|items| items.len()), Some(3));
    /// ```
    pub fn command<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Value::Array(
            parts
                .into_iter()
                .map(|part| Value::Bulk(Bytes::copy_from_slice(part.as_ref())))
                .collect(),
        )
    }

    /// Bulk payload, if this is a bulk string
    pub fn as_bulk(&self) -> Option<&Bytes> {
        match self {
            Value::Bulk(data) => Some(data),
            _ => None,
        }
    }

    /// Elements, if this is an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Short type name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            Value::SimpleString(_) => "simple-string",
            Value::Error(_) => "error",
            Value::Integer(_) => "integer",
            Value::Bulk(_) => "bulk",
            Value::Null => "null",
            Value::Array(_) => "array",
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Bulk(Bytes::copy_from_slice(text.as_bytes()))
    }
}

impl From<Bytes> for Value {
    fn from(data: Bytes) -> Self {
        Value::Bulk(data)
    }
}

impl From<Option<Bytes>> for Value {
    fn from(data: Option<Bytes>) -> Self {
        data.map(Value::Bulk).unwrap_or(Value::Null)
    }
}
