//! Pose resolution
//!
//! Every placement in a scene (instances, the payload, the gripper mount)
//! goes through [`resolve`], so the attachment pass and the injection pass
//! cannot disagree on conventions.

use super::transform::RigidTransform;

/// `(x, y, z, roll, pitch, yaw)`, meters and radians
pub type Pose6 = [f64; 6];

/// Convert a 6-vector pose into a rigid transform.
///
/// Translation first, then roll-pitch-yaw: `Transform(Rotation(rpy), xyz)`.
pub fn resolve(pose: &Pose6) -> RigidTransform {
    RigidTransform::from_rpy([pose[3], pose[4], pose[5]], [pose[0], pose[1], pose[2]])
}

/// Inverse of [`resolve`]. Angles come back in nalgebra's canonical range,
/// so poses with pitch at +/- pi/2 do not round-trip component-wise.
pub fn to_pose6(transform: &RigidTransform) -> Pose6 {
    let [x, y, z] = transform.translation();
    let [roll, pitch, yaw] = transform.rpy();
    [x, y, z, roll, pitch, yaw]
}
