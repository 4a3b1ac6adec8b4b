//! Error types for workwire.

use thiserror::Error;

/// Main error type for all workwire operations.
#[derive(Debug, Error)]
pub enum RpcError {
    /// I/O error on the underlying stream (includes EOF mid-envelope).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MsgPack serialization error.
    #[error("encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A guarded read/write exceeded its deadline. Carries the step label.
    #[error("timeout {0}")]
    Timeout(&'static str),

    /// Envelope-level violation (oversized length prefix, seq mismatch, ...).
    #[error("envelope error: {0}")]
    Envelope(String),

    /// No handler registered for the requested method name.
    #[error("no handler registered for method: {0}")]
    MethodNotFound(String),

    /// The peer reported an error inside the response envelope.
    #[error("remote error: {0}")]
    Remote(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias using RpcError.
pub type Result<T> = std::result::Result<T, RpcError>;
