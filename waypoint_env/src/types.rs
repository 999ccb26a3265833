//! Common types delivered across the environment boundary.

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

/// Opaque identifier of a tracked anchor.
///
/// The tracker hands these out as strings; a path is recorded against
/// exactly one of them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorUid(String);

impl AnchorUid {
    /// Wraps an identifier supplied by the tracker.
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }
    
    /// Mints a fresh identifier from 16 random bytes.
    ///
    /// Used when the tracker knows no prior bindings and a new anchor
    /// has to be minted. The bytes come from the caller so seeded runs
    /// mint the same uid.
    pub fn from_random_bytes(bytes: [u8; 16]) -> Self {
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid().to_string())
    }
    
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AnchorUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnchorUid {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A resolved anchor as reported by the tracker.
///
/// May arrive more than once for the same `uid` when tracking
/// re-localizes; each delivery carries the anchor's latest world->local
/// transform.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorUpdate {
    /// Stable identifier of the anchor
    pub uid: AnchorUid,
    
    /// World -> anchor-local transform at the time of resolution
    pub to_local: Matrix4<f64>,
}

impl AnchorUpdate {
    /// Creates a new update.
    pub fn new(uid: impl Into<AnchorUid>, to_local: Matrix4<f64>) -> Self {
        Self {
            uid: uid.into(),
            to_local,
        }
    }
}

impl From<String> for AnchorUid {
    fn from(s: String) -> Self {
        Self(s)
    }
}
