//! Camera mounting and intrinsics

pub mod mount;
pub mod rgbd;

pub use mount::{resolve_mount, resolve_mounts, SensorMount};
pub use rgbd::CameraProperties;
