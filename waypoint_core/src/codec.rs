//! Persistence format for waypoint paths.
//!
//! Paths are stored as JSON. Two layouts are readable:
//!
//! - **Version 1** (written by [`encode`]): tagged with `"version": 1`,
//!   matrices as 16 column-major numbers.
//!
//! ```text
//! {
//!   "version": 1,
//!   "anchor_uid": "5c9e...",
//!   "to_local":  [16 numbers],
//!   "to_world":  [16 numbers],
//!   "waypoints": [[16 numbers], ...]
//! }
//! ```
//!
//! - **Legacy** (untagged, as saved by the headset demo): `Waypoints`,
//!   `PcfTransformMatrix`, `PcfReverseTransformMatrix`, `pcfUid`, with
//!   each matrix an object of `eRC` (row, column) fields.
//!
//! `to_world` is persisted redundantly and kept as stored on load, after
//! checking it really is the inverse of `to_local`.

use crate::anchor::AnchorFrame;
use crate::error::CodecError;
use crate::waypoint_path::WaypointPath;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use waypoint_env::AnchorUid;

/// Version tag written by [`encode`].
pub const FORMAT_VERSION: u64 = 1;

/// Maximum `|to_local * to_world - I|` accepted on load. Legacy files
/// carry single-precision matrices, so this is looser than f64 noise.
pub const ANCHOR_CONSISTENCY_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Serialize, Deserialize)]
struct PathDocument {
    version: u64,
    anchor_uid: AnchorUid,
    to_local: Matrix4<f64>,
    to_world: Matrix4<f64>,
    #[serde(default)]
    waypoints: Vec<Matrix4<f64>>,
}

#[derive(Debug, Deserialize)]
struct LegacyDocument {
    #[serde(rename = "Waypoints", default)]
    waypoints: Vec<LegacyMatrix>,
    
    #[serde(rename = "PcfTransformMatrix")]
    to_local: LegacyMatrix,
    
    #[serde(rename = "PcfReverseTransformMatrix")]
    to_world: LegacyMatrix,
    
    #[serde(rename = "pcfUid", default)]
    pcf_uid: Option<String>,
}

/// Row/column-named 4x4 matrix (`e01` = row 0, column 1).
#[derive(Debug, Deserialize)]
struct LegacyMatrix {
    e00: f64, e01: f64, e02: f64, e03: f64,
    e10: f64, e11: f64, e12: f64, e13: f64,
    e20: f64, e21: f64, e22: f64, e23: f64,
    e30: f64, e31: f64, e32: f64, e33: f64,
}

impl From<LegacyMatrix> for Matrix4<f64> {
    fn from(m: LegacyMatrix) -> Self {
        Matrix4::new(
            m.e00, m.e01, m.e02, m.e03,
            m.e10, m.e11, m.e12, m.e13,
            m.e20, m.e21, m.e22, m.e23,
            m.e30, m.e31, m.e32, m.e33,
        )
    }
}

/// Serializes a path into a version 1 document.
pub fn encode(path: &WaypointPath) -> Result<Vec<u8>, CodecError> {
    let document = PathDocument {
        version: FORMAT_VERSION,
        anchor_uid: path.anchor_uid().clone(),
        to_local: *path.anchor().to_local(),
        to_world: *path.anchor().to_world(),
        waypoints: path.local_matrices().to_vec(),
    };
    Ok(serde_json::to_vec_pretty(&document)?)
}

/// Deserializes a path from either a version 1 or a legacy document.
pub fn decode(bytes: &[u8]) -> Result<WaypointPath, CodecError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(CodecError::Empty);
    }
    
    let value: Value = serde_json::from_slice(bytes)?;
    let object = value.as_object().ok_or(CodecError::UnrecognizedFormat)?;
    
    if let Some(version) = object.get("version") {
        let version = version.as_u64().ok_or(CodecError::UnrecognizedFormat)?;
        if version != FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let document: PathDocument = serde_json::from_value(value)?;
        return assemble(document.anchor_uid, document.to_local, document.to_world, document.waypoints);
    }
    
    if object.contains_key("PcfTransformMatrix") {
        let legacy: LegacyDocument = serde_json::from_value(value)?;
        let uid = legacy
            .pcf_uid
            .filter(|uid| !uid.is_empty())
            .ok_or(CodecError::MissingAnchorUid)?;
        let waypoints = legacy.waypoints.into_iter().map(Matrix4::from).collect();
        return assemble(
            AnchorUid::new(uid),
            legacy.to_local.into(),
            legacy.to_world.into(),
            waypoints,
        );
    }
    
    Err(CodecError::UnrecognizedFormat)
}

fn assemble(
    uid: AnchorUid,
    to_local: Matrix4<f64>,
    to_world: Matrix4<f64>,
    waypoints: Vec<Matrix4<f64>>,
) -> Result<WaypointPath, CodecError> {
    if uid.as_str().is_empty() {
        return Err(CodecError::MissingAnchorUid);
    }
    // Reject singular or non-finite transforms with the same error as live updates
    AnchorFrame::from_to_local(to_local)?;
    let anchor = AnchorFrame::from_parts(to_local, to_world, ANCHOR_CONSISTENCY_TOLERANCE)
        .map_err(|residual| CodecError::InconsistentAnchor { residual })?;
    Ok(WaypointPath::from_parts(uid, anchor, waypoints))
}
