//! Anchor frames: the world <-> anchor-local mapping of a tracked anchor.

use crate::error::PathError;
use crate::pose::Pose;
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

/// Determinants below this are treated as singular.
const SINGULAR_DETERMINANT: f64 = 1e-12;

/// World transform of a tracked anchor at the current moment.
///
/// `to_world` is always the inverse of `to_local`; the pair is only ever
/// replaced together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorFrame {
    to_local: Matrix4<f64>,
    to_world: Matrix4<f64>,
}

impl AnchorFrame {
    /// Anchor coincident with the world origin.
    pub fn identity() -> Self {
        Self {
            to_local: Matrix4::identity(),
            to_world: Matrix4::identity(),
        }
    }
    
    /// Builds a frame from the anchor's world->local transform.
    ///
    /// Fails if the transform has no usable inverse.
    pub fn from_to_local(to_local: Matrix4<f64>) -> Result<Self, PathError> {
        if to_local.iter().any(|v| !v.is_finite()) {
            return Err(PathError::NonFiniteTransform);
        }
        
        let determinant = to_local.determinant();
        if determinant.abs() < SINGULAR_DETERMINANT {
            return Err(PathError::SingularAnchor { determinant });
        }
        
        let to_world = to_local
            .try_inverse()
            .ok_or(PathError::SingularAnchor { determinant })?;
        
        Ok(Self { to_local, to_world })
    }
    
    /// Builds a frame from the anchor's pose in world space.
    ///
    /// Rigid poses always invert, so this cannot fail.
    pub fn from_anchor_pose(pose: &Pose) -> Self {
        let isometry = pose.to_isometry();
        Self {
            to_local: isometry.inverse().to_homogeneous(),
            to_world: isometry.to_homogeneous(),
        }
    }
    
    /// Rebuilds a frame from a persisted pair, keeping both matrices as
    /// stored.
    ///
    /// Returns the residual `max|to_local * to_world - I|` on mismatch.
    pub(crate) fn from_parts(
        to_local: Matrix4<f64>,
        to_world: Matrix4<f64>,
        tolerance: f64,
    ) -> Result<Self, f64> {
        if to_local.iter().chain(to_world.iter()).any(|v| !v.is_finite()) {
            return Err(f64::NAN);
        }
        let residual = (to_local * to_world - Matrix4::identity()).amax();
        if residual.is_nan() || residual > tolerance {
            return Err(residual);
        }
        Ok(Self { to_local, to_world })
    }
    
    /// World -> anchor-local transform.
    pub fn to_local(&self) -> &Matrix4<f64> {
        &self.to_local
    }
    
    /// Anchor-local -> world transform.
    pub fn to_world(&self) -> &Matrix4<f64> {
        &self.to_world
    }
    
    /// Re-expresses a world-space transform in anchor-local space.
    pub fn localize(&self, world: &Matrix4<f64>) -> Matrix4<f64> {
        self.to_local * world
    }
    
    /// Re-expresses an anchor-local transform in world space.
    pub fn globalize(&self, local: &Matrix4<f64>) -> Matrix4<f64> {
        self.to_world * local
    }
    
    /// The anchor's own pose in world space.
    pub fn anchor_pose(&self) -> Pose {
        Pose::from_matrix(&self.to_world)
    }
}

impl Default for AnchorFrame {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, UnitQuaternion, Vector3};
    
    fn sample_pose() -> Pose {
        Pose::new(
            Point3::new(2.0, 1.5, -4.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.8),
        )
    }
    
    #[test]
    fn test_inverse_is_cached() {
        let to_local = sample_pose().to_matrix().try_inverse().unwrap();
        let frame = AnchorFrame::from_to_local(to_local).unwrap();
        
        assert_relative_eq!(frame.to_local() * frame.to_world(), Matrix4::identity(), epsilon = 1e-12);
        assert_relative_eq!(*frame.to_world(), sample_pose().to_matrix(), epsilon = 1e-12);
    }
    
    #[test]
    fn test_singular_rejected() {
        let err = AnchorFrame::from_to_local(Matrix4::zeros()).unwrap_err();
        assert!(matches!(err, PathError::SingularAnchor { .. }));
        
        let mut flat = Matrix4::identity();
        flat[(1, 1)] = 0.0;
        assert!(AnchorFrame::from_to_local(flat).is_err());
    }
    
    #[test]
    fn test_non_finite_rejected() {
        let mut m = Matrix4::identity();
        m[(0, 3)] = f64::NAN;
        assert_eq!(AnchorFrame::from_to_local(m), Err(PathError::NonFiniteTransform));
    }
    
    #[test]
    fn test_from_anchor_pose_matches_from_to_local() {
        let a = AnchorFrame::from_anchor_pose(&sample_pose());
        let b = AnchorFrame::from_to_local(*a.to_local()).unwrap();
        assert_relative_eq!(*a.to_world(), *b.to_world(), epsilon = 1e-12);
        assert_relative_eq!(a.anchor_pose().position, sample_pose().position, epsilon = 1e-12);
    }
    
    #[test]
    fn test_localize_globalize_inverse() {
        let frame = AnchorFrame::from_anchor_pose(&sample_pose());
        let world = Pose::at(Point3::new(10.0, 0.0, 3.0)).to_matrix();
        let back = frame.globalize(&frame.localize(&world));
        assert_relative_eq!(back, world, epsilon = 1e-12);
    }
    
    #[test]
    fn test_from_parts_checks_consistency() {
        let frame = AnchorFrame::from_anchor_pose(&sample_pose());
        assert!(AnchorFrame::from_parts(*frame.to_local(), *frame.to_world(), 1e-9).is_ok());
        
        let residual = AnchorFrame::from_parts(*frame.to_local(), Matrix4::identity(), 1e-9).unwrap_err();
        assert!(residual > 1.0);
    }
}
