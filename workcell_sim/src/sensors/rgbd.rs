use serde::Serialize;

use crate::config::CameraInfoFile;

/// Intrinsic properties of an RGB-D camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraProperties {
    /// Horizontal resolution (pixels)
    pub width: u32,
    /// Vertical resolution (pixels)
    pub height: u32,
    /// Vertical field of view (radians)
    pub fov_y: f64,
    /// Near clip (meters)
    pub z_near: f64,
    /// Far clip (meters)
    pub z_far: f64,
}

impl Default for CameraProperties {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fov_y: std::f64::consts::FRAC_PI_4,
            z_near: 0.1,
            z_far: 2.0,
        }
    }
}

impl CameraProperties {
    /// Apply resolution and focal length from a `camera_info` file.
    ///
    /// Fields the file leaves out keep their current value.
    pub fn with_camera_info(mut self, info: &CameraInfoFile) -> Self {
        if let (Some(width), Some(height)) = (info.image_width, info.image_height) {
            if width > 0 && height > 0 {
                self.width = width;
                self.height = height;
            }
        }
        if let Some(fy) = info.focal_length_y() {
            self.fov_y = 2.0 * (self.height as f64 / (2.0 * fy)).atan();
        }
        self
    }

    /// Vertical focal length in pixels
    pub fn focal_length_y(&self) -> f64 {
        self.height as f64 / (2.0 * (self.fov_y / 2.0).tan())
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}
