//! Frames and poses
//!
//! - [`RigidTransform`]: rotation + translation, built from roll-pitch-yaw or
//!   quaternion components
//! - [`resolve`]: the single 6-vector pose convention used across the scene
//! - [`FrameTree`]: the kinematic frame hierarchy owned by the plant

pub mod pose;
pub mod transform;
pub mod tree;

pub use pose::{resolve, to_pose6, Pose6};
pub use transform::RigidTransform;
pub use tree::{FrameMotion, FrameNode, FrameTree};
