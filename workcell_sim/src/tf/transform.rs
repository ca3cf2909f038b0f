//! Rigid transform math
//!
//! Thin wrapper over nalgebra's `Isometry3<f64>` so the rest of the engine
//! speaks one convention: `a.compose(&b)` is `a * b`, i.e. a pose of frame C
//! in B composed onto a pose of B in A yields the pose of C in A.

use nalgebra::{Isometry3, Point3, Quaternion, Translation3, Unit, UnitQuaternion, Vector3};

/// Quaternions with a smaller norm than this are rejected as malformed
const MIN_QUATERNION_NORM: f64 = 1e-9;

/// Rotation plus translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    isometry: Isometry3<f64>,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            isometry: Isometry3::identity(),
        }
    }

    pub fn from_translation(xyz: [f64; 3]) -> Self {
        Self::from_parts(UnitQuaternion::identity(), xyz)
    }

    /// Build from roll-pitch-yaw angles (radians) and a translation.
    ///
    /// The rotation is `Rz(yaw) * Ry(pitch) * Rx(roll)`.
    pub fn from_rpy(rpy: [f64; 3], xyz: [f64; 3]) -> Self {
        Self::from_parts(UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]), xyz)
    }

    /// Build from quaternion components `(w, x, y, z)` and a translation.
    ///
    /// The quaternion is normalized; `None` if it is (numerically) zero.
    pub fn from_quaternion(wxyz: [f64; 4], xyz: [f64; 3]) -> Option<Self> {
        let quaternion = Quaternion::new(wxyz[0], wxyz[1], wxyz[2], wxyz[3]);
        let rotation = Unit::try_new(quaternion, MIN_QUATERNION_NORM)?;
        Some(Self::from_parts(rotation, xyz))
    }

    /// Rotation of `angle` radians about `axis`; identity for a zero axis.
    pub fn from_axis_angle(axis: [f64; 3], angle: f64) -> Self {
        let rotation = Unit::try_new(Vector3::from(axis), MIN_QUATERNION_NORM)
            .map(|axis| UnitQuaternion::from_axis_angle(&axis, angle))
            .unwrap_or_else(UnitQuaternion::identity);
        Self::from_parts(rotation, [0.0; 3])
    }

    fn from_parts(rotation: UnitQuaternion<f64>, xyz: [f64; 3]) -> Self {
        Self {
            isometry: Isometry3::from_parts(Translation3::new(xyz[0], xyz[1], xyz[2]), rotation),
        }
    }

    pub fn isometry(&self) -> &Isometry3<f64> {
        &self.isometry
    }

    pub fn translation(&self) -> [f64; 3] {
        let t = &self.isometry.translation.vector;
        [t.x, t.y, t.z]
    }

    pub fn rotation(&self) -> &UnitQuaternion<f64> {
        &self.isometry.rotation
    }

    /// Quaternion components `(w, x, y, z)`
    pub fn quaternion_wxyz(&self) -> [f64; 4] {
        let q = self.isometry.rotation.quaternion();
        [q.w, q.i, q.j, q.k]
    }

    /// Roll, pitch, yaw (radians)
    pub fn rpy(&self) -> [f64; 3] {
        let (roll, pitch, yaw) = self.isometry.rotation.euler_angles();
        [roll, pitch, yaw]
    }

    /// `self * other`
    pub fn compose(&self, other: &RigidTransform) -> RigidTransform {
        Self {
            isometry: self.isometry * other.isometry,
        }
    }

    pub fn inverse(&self) -> RigidTransform {
        Self {
            isometry: self.isometry.inverse(),
        }
    }

    pub fn transform_point(&self, point: [f64; 3]) -> [f64; 3] {
        let p = self
            .isometry
            .transform_point(&Point3::new(point[0], point[1], point[2]));
        [p.x, p.y, p.z]
    }

    /// Component-wise comparison of translation and rotation (sign-invariant)
    pub fn approx_eq(&self, other: &RigidTransform, tolerance: f64) -> bool {
        let dt = self.isometry.translation.vector - other.isometry.translation.vector;
        let angle = self.isometry.rotation.angle_to(&other.isometry.rotation);
        dt.norm() <= tolerance && angle <= tolerance
    }
}
