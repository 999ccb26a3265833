//! Rigid poses and their 4x4 matrix form.

use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A world- or anchor-space position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl Pose {
    /// Creates a pose.
    pub fn new(position: Point3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        Self { position, rotation }
    }
    
    /// Origin, no rotation.
    ///
    /// Also what out-of-range waypoint lookups return, so it doubles as
    /// the "no such waypoint" sentinel.
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }
    
    /// A pose at `position` with no rotation.
    pub fn at(position: Point3<f64>) -> Self {
        Self::new(position, UnitQuaternion::identity())
    }
    
    /// Returns true if this is exactly the identity pose.
    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
    
    /// Extracts the pose encoded in a homogeneous transform.
    ///
    /// Position is the translation column. Rotation is the orthonormal
    /// part of the upper 3x3 with any scale divided out; a degenerate
    /// (zero-scale) basis yields the identity rotation.
    pub fn from_matrix(m: &Matrix4<f64>) -> Self {
        let position = Point3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        
        let mut basis: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let mut degenerate = false;
        for mut column in basis.column_iter_mut() {
            let norm = column.norm();
            if norm <= f64::EPSILON {
                degenerate = true;
                break;
            }
            column /= norm;
        }
        
        let rotation = if degenerate {
            UnitQuaternion::identity()
        } else {
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix(&basis))
        };
        
        Self { position, rotation }
    }
    
    /// Homogeneous transform of this pose (unit scale).
    pub fn to_matrix(&self) -> Matrix4<f64> {
        self.to_isometry().to_homogeneous()
    }
    
    /// Rigid transform of this pose.
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position.coords), self.rotation)
    }
    
    /// Direction the pose faces (+Z in its local frame).
    pub fn forward(&self) -> Vector3<f64> {
        self.rotation * Vector3::z()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;
    
    #[test]
    fn test_matrix_roundtrip() {
        let pose = Pose::new(
            Point3::new(1.0, -2.0, 3.5),
            UnitQuaternion::from_euler_angles(0.1, 0.7, -0.3),
        );
        let back = Pose::from_matrix(&pose.to_matrix());
        
        assert_relative_eq!(back.position, pose.position, epsilon = 1e-12);
        assert_relative_eq!(back.rotation.angle_to(&pose.rotation), 0.0, epsilon = 1e-9);
    }
    
    #[test]
    fn test_scale_is_divided_out() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
        let scaled = Pose::new(Point3::new(4.0, 5.0, 6.0), rotation).to_matrix()
            * Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 3.0, 0.5));
        
        let pose = Pose::from_matrix(&scaled);
        assert_relative_eq!(pose.position, Point3::new(4.0, 5.0, 6.0), epsilon = 1e-12);
        assert_relative_eq!(pose.rotation.angle_to(&rotation), 0.0, epsilon = 1e-9);
    }
    
    #[test]
    fn test_zero_scale_gives_identity_rotation() {
        let mut m = Matrix4::zeros();
        m[(0, 3)] = 1.0;
        m[(3, 3)] = 1.0;
        
        let pose = Pose::from_matrix(&m);
        assert_eq!(pose.position, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(pose.rotation, UnitQuaternion::identity());
    }
    
    #[test]
    fn test_identity_sentinel() {
        assert!(Pose::identity().is_identity());
        assert!(Pose::default().is_identity());
        assert!(!Pose::at(Point3::new(0.0, 0.0, 1e-9)).is_identity());
    }
    
    #[test]
    fn test_forward() {
        let pose = Pose::new(
            Point3::origin(),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2),
        );
        assert_relative_eq!(pose.forward(), Vector3::x(), epsilon = 1e-12);
    }
}
