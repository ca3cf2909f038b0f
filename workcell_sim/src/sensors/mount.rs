//! Sensor mount resolution
//!
//! A camera's calibration directory names the body it is rigidly attached
//! to and the camera pose in that body. Mounts are resolved against a
//! finalized plant so that every body frame already exists.

use std::path::Path;

use tracing::info;

use super::rgbd::CameraProperties;
use crate::config::{
    expand_path, load_calibration, CameraInfoFile, ExtrinsicsFile, SensorSpec,
    DEPTH_INTRINSICS_FILE, EXTRINSICS_FILE, RGB_INTRINSICS_FILE,
};
use crate::error::{SceneError, SceneResult};
use crate::plant::{FrameRef, MultibodyPlant, PlantState};
use crate::tf::RigidTransform;

/// Where a camera sits and what it sees
#[derive(Debug, Clone, PartialEq)]
pub struct SensorMount {
    pub name: String,
    pub channel: String,
    /// Body the camera is attached to
    pub frame: FrameRef,
    /// Camera optical frame in the body frame (`X_BC`)
    pub body_to_camera: RigidTransform,
    pub properties: CameraProperties,
}

impl SensorMount {
    /// Output port names exported for this camera
    pub fn exported_ports(&self) -> [String; 3] {
        [
            format!("{}_rgb_image", self.name),
            format!("{}_depth_image", self.name),
            format!("{}_label_image", self.name),
        ]
    }

    /// Camera pose in the world for a plant state
    pub fn world_pose(&self, plant: &MultibodyPlant, state: &PlantState) -> SceneResult<RigidTransform> {
        let body = plant.body_world_pose(state, self.frame.body)?;
        Ok(body.compose(&self.body_to_camera))
    }
}

/// Read the three calibration files of `spec` and attach the camera to the
/// referenced body.
pub fn resolve_mount(
    spec: &SensorSpec,
    plant: &MultibodyPlant,
    base_dir: Option<&Path>,
) -> SceneResult<SensorMount> {
    plant.ensure_finalized("resolve_mount")?;

    let key = format!("cameras.{}.config_base_dir", spec.name);
    let dir = expand_path(&spec.config_base_dir, base_dir, &key)?;

    let extrinsics: ExtrinsicsFile = load_calibration(&dir.join(EXTRINSICS_FILE))?;
    let _rgb: CameraInfoFile = load_calibration(&dir.join(RGB_INTRINSICS_FILE))?;
    let depth: CameraInfoFile = load_calibration(&dir.join(DEPTH_INTRINSICS_FILE))?;

    let extrinsics = extrinsics.depth.extrinsics;
    let body_to_camera = extrinsics
        .transform_to_reference_link
        .to_transform()
        .ok_or_else(|| {
            SceneError::missing_calibration(
                dir.join(EXTRINSICS_FILE),
                "transform_to_reference_link.rotation is a zero quaternion",
            )
        })?;

    let frame = plant.resolve_frame(&extrinsics.reference_link_name)?;
    let properties = CameraProperties::default().with_camera_info(&depth);

    info!(
        "Mounted camera '{}' on '{}' ({}x{})",
        spec.name, frame.name, properties.width, properties.height
    );

    Ok(SensorMount {
        name: spec.name.clone(),
        channel: spec.channel.clone(),
        frame,
        body_to_camera,
        properties,
    })
}

/// Resolve every camera before any of them is wired
pub fn resolve_mounts(
    specs: &[SensorSpec],
    plant: &MultibodyPlant,
    base_dir: Option<&Path>,
) -> SceneResult<Vec<SensorMount>> {
    specs
        .iter()
        .map(|spec| resolve_mount(spec, plant, base_dir))
        .collect()
}
