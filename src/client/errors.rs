//! # Client Errors
//!
//! Configuration errors are fatal and surface synchronously at
//! construction; everything else at runtime degrades gracefully.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Client errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Missing or invalid startup parameter
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store reference was released by `clean()`
    #[error("Store was released by clean()")]
    StoreReleased,

    /// Store failure surfaced through the client API
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClientError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
