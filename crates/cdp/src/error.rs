//! Error types for the protocol runtime.
//!
//! Callers always see one of these classified failures, never a raw
//! transport error.

use thiserror::Error;

/// Result type for CDP operations
pub type Result<T> = std::result::Result<T, CDPError>;

#[derive(Debug, Error)]
pub enum CDPError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CDP protocol error: {code} - {message}")]
    Remote { code: i64, message: String },

    #[error("Command timed out")]
    Timeout,

    #[error("Connection closed")]
    Closed,

    #[error("Blocking command call from the dispatch context would deadlock")]
    WouldDeadlock,
}
