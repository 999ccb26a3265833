//! Error types for the waypoint engine.

use thiserror::Error;
use waypoint_env::EnvError;

/// Errors raised by pose and anchor math.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PathError {
    /// The anchor's world->local transform has no inverse
    #[error("Anchor transform is singular (determinant {determinant:e})")]
    SingularAnchor { determinant: f64 },
    
    /// The anchor's transform contains NaN or infinite entries
    #[error("Anchor transform contains non-finite values")]
    NonFiniteTransform,
}

/// Errors raised while encoding or decoding a persisted path.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Persisted path is empty")]
    Empty,
    
    #[error("Malformed path document: {0}")]
    Json(#[from] serde_json::Error),
    
    #[error("Unsupported path format version {0}")]
    UnsupportedVersion(u64),
    
    #[error("Document is neither a versioned nor a legacy waypoint path")]
    UnrecognizedFormat,
    
    #[error("Persisted path has no anchor identifier")]
    MissingAnchorUid,
    
    /// The redundant world transform disagrees with the local one
    #[error("Persisted anchor transforms are not inverses (residual {residual:e})")]
    InconsistentAnchor { residual: f64 },
    
    #[error("Persisted anchor is invalid: {0}")]
    Anchor(#[from] PathError),
}

/// Errors raised by a [`crate::WaypointSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Recording or saving before any matching anchor has resolved
    #[error("No anchor resolved for this session yet")]
    NoAnchor,
    
    #[error(transparent)]
    Path(#[from] PathError),
    
    #[error(transparent)]
    Codec(#[from] CodecError),
    
    #[error(transparent)]
    Store(#[from] EnvError),
}
