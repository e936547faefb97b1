//! Protocol Module
//!
//! Defines the wire protocol for client-server communication and for the
//! append-only file. Both use the same encoding.
//!
//! ## Protocol Format
//!
//! Every value starts with a type byte; every line ends with CRLF.
//!
//! ```text
//! ┌──────────┬──────────────────────┬──────────────────────────────┐
//! │ Type (1) │ Header line + CRLF   │ Payload (Array/Bulk only)    │
//! └──────────┴──────────────────────┴──────────────────────────────┘
//! ```
//!
//! ### Type Bytes
//! - `*`: Array       - header: element count, payload: encoded elements
//! - `$`: Bulk string - header: byte length (-1 = Null), payload: bytes + CRLF
//! - `+`: Simple string (replies only)
//! - `-`: Error         (replies only)
//! - `:`: Integer       (replies only)
//!
//! ### Requests
//! A request is an Array of bulk strings: command name followed by arguments.
//! ```text
//! *3\r\n$3\r\nSET\r\n$4\r\nname\r\n$5\r\nAhmed\r\n
//! ```

mod value;
mod codec;

pub use value::Value;
pub use codec::{
    decode, encode, encode_into, read_reply, write_value, RespReader, ARRAY, BULK,
    DEFAULT_MAX_BULK_LEN, DEFAULT_MAX_DEPTH, ERROR, INTEGER, MAX_LINE_LEN, SIMPLE_STRING,
};
