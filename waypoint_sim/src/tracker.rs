//! Simulated anchor tracker.
//!
//! Stands in for the headset's persistent coordinate frames: it owns the
//! "true" pose of one anchor, reports it on request, and can knock it
//! around to mimic re-localization after tracking loss. All randomness
//! comes from a single seed.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use waypoint_core::{AnchorFrame, Pose};
use waypoint_env::{AnchorUid, AnchorUpdate};

/// Standard deviation of the re-localization position jump (meters).
const RELOCALIZE_POSITION_STD: f64 = 0.5;

/// Standard deviation of the re-localization heading jump (radians).
const RELOCALIZE_YAW_STD: f64 = 0.2;

/// Seeded source of anchor poses and walk targets.
pub struct AnchorTracker {
    uid: AnchorUid,
    pose: Pose,
    rng: ChaCha8Rng,
}

impl AnchorTracker {
    /// Creates a tracker with a random anchor placed within 10m of the
    /// world origin.
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let uid = AnchorUid::from_random_bytes(rng.gen());
        let pose = Pose::new(
            Point3::new(rng.gen_range(-10.0..10.0), rng.gen_range(-0.5..0.5), rng.gen_range(-10.0..10.0)),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI)),
        );
        
        Self { uid, pose, rng }
    }
    
    pub fn uid(&self) -> &AnchorUid {
        &self.uid
    }
    
    /// Current true world pose of the anchor.
    pub fn pose(&self) -> Pose {
        self.pose
    }
    
    pub fn frame(&self) -> AnchorFrame {
        AnchorFrame::from_anchor_pose(&self.pose)
    }
    
    /// What the tracker reports when the anchor resolves.
    pub fn resolve(&self) -> AnchorUpdate {
        AnchorUpdate::new(self.uid.clone(), *self.frame().to_local())
    }
    
    /// Moves the anchor as a re-localization would and returns the new
    /// report.
    pub fn relocalize(&mut self) -> AnchorUpdate {
        let offset = Vector3::new(self.gaussian(RELOCALIZE_POSITION_STD), 0.0, self.gaussian(RELOCALIZE_POSITION_STD));
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.gaussian(RELOCALIZE_YAW_STD));
        
        self.pose = Pose::new(self.pose.position + offset, yaw * self.pose.rotation);
        self.resolve()
    }
    
    /// A random standing pose on the floor within `radius` of the anchor.
    ///
    /// A non-positive `radius` stands on the anchor itself.
    pub fn random_pose_near_anchor(&mut self, radius: f64) -> Pose {
        let angle = self.rng.gen_range(0.0..std::f64::consts::TAU);
        let distance = if radius > 0.0 && radius.is_finite() {
            self.rng.gen_range(0.0..radius)
        } else {
            0.0
        };
        let heading = self.rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI);
        
        Pose::new(
            Point3::new(
                self.pose.position.x + distance * angle.cos(),
                0.0,
                self.pose.position.z + distance * angle.sin(),
            ),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), heading),
        )
    }
    
    fn gaussian(&mut self, std: f64) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        z * std
    }
}
