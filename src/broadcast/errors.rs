//! # Broadcast Errors
//!
//! Error types for broadcast payload decoding. Decode failures are
//! never fatal: receivers log and discard the offending value.

use thiserror::Error;

/// Result type for broadcast operations
pub type BroadcastResult<T> = Result<T, BroadcastError>;

/// Broadcast errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BroadcastError {
    /// A received value failed the expected shape check
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl BroadcastError {
    /// Create a malformed-payload error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }
}
