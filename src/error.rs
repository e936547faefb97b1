//! Error types for EmberKV
//!
//! Provides a unified error type for all operations.
//!
//! Wrong-arity and unknown-command conditions are not errors here: they are
//! ordinary `Value::Error` replies sent back to the client.

use thiserror::Error;

/// Result type alias using EmberError
pub type Result<T> = std::result::Result<T, EmberError>;

/// Unified error type for EmberKV operations
#[derive(Debug, Error)]
pub enum EmberError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Malformed or truncated input while decoding a value
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Persistence Errors
    // -------------------------------------------------------------------------
    /// Opening, writing, syncing or replaying the append-only file failed
    #[error("Persistence error: {context}: {source}")]
    Persistence {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EmberError {
    /// Wrap an I/O error raised by the append-only file
    pub fn persistence(context: &'static str, source: std::io::Error) -> Self {
        EmberError::Persistence { context, source }
    }

    /// Whether this is a decode failure the connection layer must answer by closing
    pub fn is_protocol(&self) -> bool {
        matches!(self, EmberError::Protocol(_))
    }
}
