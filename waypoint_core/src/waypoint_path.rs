//! The waypoint path store.
//!
//! Waypoints are kept in the local frame of the anchor they were recorded
//! against. Re-localizing the anchor never touches them; it only changes
//! the mapping used to read them back out in world space.

use crate::anchor::AnchorFrame;
use crate::error::PathError;
use crate::pose::Pose;
use nalgebra::Matrix4;
use waypoint_env::AnchorUid;

/// Ordered, anchor-relative sequence of recorded poses.
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointPath {
    /// Anchor-local transforms, in recording order
    waypoints: Vec<Matrix4<f64>>,
    
    /// Current world <-> anchor mapping
    anchor: AnchorFrame,
    
    /// The anchor this path belongs to; fixed for the path's lifetime
    anchor_uid: AnchorUid,
}

impl WaypointPath {
    /// Creates an empty path for the given anchor.
    pub fn new(anchor_uid: AnchorUid, anchor: AnchorFrame) -> Self {
        Self {
            waypoints: Vec::new(),
            anchor,
            anchor_uid,
        }
    }
    
    /// Creates an empty path from the anchor's world->local transform.
    pub fn for_anchor(anchor_uid: AnchorUid, to_local: Matrix4<f64>) -> Result<Self, PathError> {
        Ok(Self::new(anchor_uid, AnchorFrame::from_to_local(to_local)?))
    }
    
    pub(crate) fn from_parts(
        anchor_uid: AnchorUid,
        anchor: AnchorFrame,
        waypoints: Vec<Matrix4<f64>>,
    ) -> Self {
        Self {
            waypoints,
            anchor,
            anchor_uid,
        }
    }
    
    /// Replaces the anchor mapping with a freshly tracked world->local
    /// transform.
    ///
    /// On error the previous mapping is kept.
    pub fn set_anchor_frame(&mut self, to_local: Matrix4<f64>) -> Result<(), PathError> {
        self.anchor = AnchorFrame::from_to_local(to_local)?;
        Ok(())
    }
    
    /// Replaces the anchor mapping with an already-built frame.
    pub fn relocalize(&mut self, anchor: AnchorFrame) {
        self.anchor = anchor;
    }
    
    /// Records a world-space transform as the next waypoint.
    pub fn append(&mut self, world_pose: &Matrix4<f64>) {
        self.waypoints.push(self.anchor.localize(world_pose));
    }
    
    /// Records a world-space pose as the next waypoint.
    pub fn append_pose(&mut self, pose: &Pose) {
        self.append(&pose.to_matrix());
    }
    
    /// World pose of waypoint `i`.
    ///
    /// Out-of-range indices (negative included) return [`Pose::identity`].
    /// Use [`WaypointPath::waypoint`] to tell "missing" from "at origin".
    pub fn get_waypoint(&self, i: isize) -> Pose {
        usize::try_from(i)
            .ok()
            .and_then(|i| self.waypoint(i))
            .unwrap_or_else(Pose::identity)
    }
    
    /// World pose of waypoint `i`, if it exists.
    pub fn waypoint(&self, i: usize) -> Option<Pose> {
        self.waypoints
            .get(i)
            .map(|local| Pose::from_matrix(&self.anchor.globalize(local)))
    }
    
    /// World poses of every waypoint, in order.
    pub fn world_poses(&self) -> impl Iterator<Item = Pose> + '_ {
        self.waypoints
            .iter()
            .map(move |local| Pose::from_matrix(&self.anchor.globalize(local)))
    }
    
    /// Number of recorded waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
    
    /// The stored anchor-local transforms.
    pub fn local_matrices(&self) -> &[Matrix4<f64>] {
        &self.waypoints
    }
    
    pub fn anchor(&self) -> &AnchorFrame {
        &self.anchor
    }
    
    pub fn anchor_uid(&self) -> &AnchorUid {
        &self.anchor_uid
    }
    
    /// Returns true if this path was recorded against `uid`.
    pub fn is_for_anchor(&self, uid: &AnchorUid) -> bool {
        self.anchor_uid == *uid
    }
}
