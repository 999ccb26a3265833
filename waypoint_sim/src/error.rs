//! Why a scenario stopped.

use thiserror::Error;
use waypoint_core::{CodecError, SessionError};
use waypoint_env::EnvError;

#[derive(Debug, Error)]
pub enum ScenarioFailure {
    /// An expectation about the engine did not hold
    #[error("{0}")]
    Check(String),
    
    #[error("session error: {0}")]
    Session(#[from] SessionError),
    
    #[error("store error: {0}")]
    Store(#[from] EnvError),
    
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScenarioFailure {
    pub fn check(reason: impl Into<String>) -> Self {
        Self::Check(reason.into())
    }
}
