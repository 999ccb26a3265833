//! Error types for the waypoint environment seams.

use thiserror::Error;

/// Errors that can occur at the environment boundary.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Underlying storage failed (I/O, embedded database, etc.)
    #[error("Storage error: {0}")]
    StorageError(String),
    
    /// A storage key that cannot be mapped onto the backend
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl EnvError {
    /// Creates a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }
    
    /// Creates an invalid-key error.
    pub fn invalid_key(key: impl std::fmt::Display) -> Self {
        Self::InvalidKey(key.to_string())
    }
}

impl From<std::io::Error> for EnvError {
    fn from(e: std::io::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}
