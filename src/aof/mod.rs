//! Append-Only File (AOF) Module
//!
//! Provides durability by logging every accepted write request.
//!
//! ## Responsibilities
//! - Append the encoded request of each mutating command
//! - Periodically fsync the file from a background task
//! - Replay the file at startup to rebuild the store
//!
//! ## File Format
//! No header, footer or checksum: just encoded request Arrays, back to back,
//! in the order they were accepted.
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ *3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n    │
//! ├──────────────────────────────────────────────┤
//! │ *4\r\n$4\r\nHSET\r\n...                      │
//! └──────────────────────────────────────────────┘
//! ```

mod file;
mod syncer;

pub use file::{Aof, AofStorage};
pub use syncer::SyncTask;
