//! Camera calibration files
//!
//! Three YAML files live in each camera's `config_base_dir`:
//! `camera_info.yaml` (extrinsics), `rgb_camera_info.yaml` and
//! `depth_camera_info.yaml` (intrinsics, ROS `camera_info` layout).

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{SceneError, SceneResult};
use crate::tf::RigidTransform;

pub const EXTRINSICS_FILE: &str = "camera_info.yaml";
pub const RGB_INTRINSICS_FILE: &str = "rgb_camera_info.yaml";
pub const DEPTH_INTRINSICS_FILE: &str = "depth_camera_info.yaml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtrinsicsFile {
    pub depth: DepthExtrinsicsSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DepthExtrinsicsSection {
    pub extrinsics: Extrinsics,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Extrinsics {
    pub reference_link_name: String,
    pub transform_to_reference_link: TransformRecord,
}

/// Quaternion + translation as written by the calibration tools
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransformRecord {
    pub rotation: QuaternionRecord,
    pub translation: TranslationRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct QuaternionRecord {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TranslationRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl TransformRecord {
    /// `None` for a zero quaternion
    pub fn to_transform(&self) -> Option<RigidTransform> {
        let r = &self.rotation;
        let t = &self.translation;
        RigidTransform::from_quaternion([r.w, r.x, r.y, r.z], [t.x, t.y, t.z])
    }
}

/// Subset of a ROS `camera_info` file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CameraInfoFile {
    #[serde(default)]
    pub image_width: Option<u32>,
    #[serde(default)]
    pub image_height: Option<u32>,
    #[serde(default)]
    pub camera_matrix: Option<MatrixRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatrixRecord {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl CameraInfoFile {
    /// Vertical focal length in pixels, from a 3x3 row-major camera matrix
    pub fn focal_length_y(&self) -> Option<f64> {
        let matrix = self.camera_matrix.as_ref()?;
        if matrix.rows != 3 || matrix.cols != 3 || matrix.data.len() != 9 {
            return None;
        }
        let fy = matrix.data[4];
        (fy.is_finite() && fy > 0.0).then_some(fy)
    }
}

/// Read one calibration file; every failure is a missing-calibration error
/// naming the file.
pub fn load_calibration<T: DeserializeOwned>(path: &Path) -> SceneResult<T> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| SceneError::missing_calibration(path, e.to_string()))?;
    serde_yaml::from_str(&text).map_err(|e| SceneError::missing_calibration(path, e.to_string()))
}
