//! Scene configuration schema
//!
//! ```yaml
//! models:
//!   table: models/table.sdf
//!   brick: ${MODELS}/brick.urdf
//! instances:
//!   - model: table
//!     q0: [0.75, 0.0, -0.7645, 0.0, 0.0, 0.0]
//!     fixed: true
//!   - model: brick
//!     q0: [0.6, 0.0, 0.02, 0.0, 0.0, 0.0]
//!     fixed: false
//! cameras:
//!   - name: camera_0
//!     channel: DEPTH_0
//!     config_base_dir: calibration/camera_0
//! time_step: 0.002
//! ```
//!
//! Every struct rejects keys it does not know, so a misspelled key is an
//! error instead of a silently applied default.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SceneError, SceneResult};
use crate::tf::Pose6;

pub const DEFAULT_REALTIME_RATE: f64 = 1.0;
pub const DEFAULT_DURATION: f64 = f64::INFINITY;

/// Root of a scene file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneConfig {
    /// Model class name -> resource path
    pub models: BTreeMap<String, String>,

    pub instances: Vec<InstanceSpec>,

    #[serde(default)]
    pub cameras: Vec<SensorSpec>,

    pub time_step: f64,

    #[serde(default)]
    pub target_realtime_rate: Option<f64>,

    #[serde(default)]
    pub duration: Option<f64>,

    #[serde(default)]
    pub station: Option<StationConfig>,

    #[serde(default)]
    pub payload: Option<PayloadConfig>,

    /// Directory relative resource paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// One requested physical object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceSpec {
    #[serde(default)]
    pub name: Option<String>,

    pub model: String,

    /// `(x, y, z, roll, pitch, yaw)`
    pub q0: Vec<f64>,

    /// Welded to the world at `q0` when true, otherwise a free body
    pub fixed: bool,
}

impl InstanceSpec {
    pub fn pose(&self) -> SceneResult<Pose6> {
        pose6(&self.q0, "q0")
    }
}

/// An RGB-D camera and the directory holding its calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorSpec {
    pub name: String,
    pub channel: String,
    pub config_base_dir: String,
}

/// Arm and gripper assembly around which the control topology is wired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationConfig {
    /// Model class of the arm, welded to the world origin
    pub arm: String,

    /// Model class of the gripper, welded to `gripper_parent_body`
    pub gripper: String,

    #[serde(default = "default_arm_name")]
    pub arm_name: String,

    #[serde(default = "default_gripper_name")]
    pub gripper_name: String,

    /// Arm body the gripper is mounted on
    #[serde(default = "default_gripper_parent_body")]
    pub gripper_parent_body: String,

    #[serde(default = "default_gripper_mount")]
    pub gripper_mount: Vec<f64>,

    #[serde(default = "default_joint_seed")]
    pub joint_seed: Vec<f64>,

    #[serde(default)]
    pub channels: ChannelConfig,
}

impl StationConfig {
    pub fn new(arm: impl Into<String>, gripper: impl Into<String>) -> Self {
        Self {
            arm: arm.into(),
            gripper: gripper.into(),
            arm_name: default_arm_name(),
            gripper_name: default_gripper_name(),
            gripper_parent_body: default_gripper_parent_body(),
            gripper_mount: default_gripper_mount(),
            joint_seed: default_joint_seed(),
            channels: ChannelConfig::default(),
        }
    }

    pub fn gripper_mount_pose(&self) -> SceneResult<Pose6> {
        pose6(&self.gripper_mount, "station.gripper_mount")
    }
}

/// Transport channel names for the arm and gripper drivers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    pub command: String,
    pub status: String,
    pub gripper_action: String,
    pub gripper_status: String,
    /// Status publisher period (seconds)
    pub status_period: f64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            command: "IIWA_COMMAND".to_string(),
            status: "IIWA_STATUS".to_string(),
            gripper_action: "/wsg50_driver/wsg50/gripper_control/".to_string(),
            gripper_status: "/wsg50_driver/wsg50/status".to_string(),
            status_period: 0.005,
        }
    }
}

/// Free object placed by the injector rather than by an instance entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PayloadConfig {
    pub model: String,

    /// Instance name, defaults to the model class
    #[serde(default)]
    pub name: Option<String>,

    /// Overrides the default placement `(0.6, 0, 0, 0, 0, 0)`
    #[serde(default)]
    pub q0: Option<Vec<f64>>,
}

pub const DEFAULT_PAYLOAD_POSE: Pose6 = [0.6, 0.0, 0.0, 0.0, 0.0, 0.0];

impl PayloadConfig {
    pub fn instance_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.model)
    }

    pub fn pose(&self) -> SceneResult<Pose6> {
        match &self.q0 {
            Some(q0) => pose6(q0, "payload.q0"),
            None => Ok(DEFAULT_PAYLOAD_POSE),
        }
    }
}

fn default_arm_name() -> String {
    "iiwa".to_string()
}

fn default_gripper_name() -> String {
    "wsg".to_string()
}

fn default_gripper_parent_body() -> String {
    "iiwa_link_7".to_string()
}

fn default_gripper_mount() -> Vec<f64> {
    vec![
        0.0,
        0.0,
        0.114,
        std::f64::consts::FRAC_PI_2,
        0.0,
        std::f64::consts::FRAC_PI_2,
    ]
}

fn default_joint_seed() -> Vec<f64> {
    vec![0.0, 0.6, 0.0, -1.75, 0.0, 1.0, 0.0]
}

fn pose6(values: &[f64], key: &str) -> SceneResult<Pose6> {
    let pose: Pose6 = values.try_into().map_err(|_| {
        SceneError::config(
            key,
            format!("expected 6 values (x, y, z, roll, pitch, yaw), found {}", values.len()),
        )
    })?;
    if pose.iter().any(|v| !v.is_finite()) {
        return Err(SceneError::config(key, "pose values must be finite"));
    }
    Ok(pose)
}

impl SceneConfig {
    /// Parse and validate a scene from YAML text
    pub fn from_yaml_str(text: &str) -> SceneResult<Self> {
        let config: SceneConfig = serde_yaml::from_str(text).map_err(|e| SceneError::from_yaml(&e))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a scene file; relative resource paths resolve
    /// against the file's directory.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SceneError::config("<file>", format!("cannot read {}: {}", path.display(), e))
        })?;

        let mut config: SceneConfig =
            serde_yaml::from_str(&text).map_err(|e| SceneError::from_yaml(&e))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        config.validate()?;

        debug!(
            "Loaded scene config {} ({} models, {} instances, {} cameras)",
            path.display(),
            config.models.len(),
            config.instances.len(),
            config.cameras.len()
        );
        Ok(config)
    }

    /// Check every invariant serde cannot express
    pub fn validate(&self) -> SceneResult<()> {
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(SceneError::config(
                "time_step",
                format!("must be a positive number, got {}", self.time_step),
            ));
        }
        if let Some(rate) = self.target_realtime_rate {
            validate_realtime_rate(rate, "target_realtime_rate")?;
        }
        if let Some(duration) = self.duration {
            validate_duration(duration, "duration")?;
        }

        let mut names = HashSet::new();
        for (i, instance) in self.instances.iter().enumerate() {
            self.require_model(&instance.model, &format!("instances[{}].model", i))?;
            pose6(&instance.q0, &format!("instances[{}].q0", i))?;

            if let Some(name) = &instance.name {
                let key = format!("instances[{}].name", i);
                validate_name(name, &key)?;
                if !names.insert(name.as_str()) {
                    return Err(SceneError::config(key, format!("duplicate instance name '{}'", name)));
                }
            }
        }

        let mut cameras = HashSet::new();
        for (i, camera) in self.cameras.iter().enumerate() {
            let key = format!("cameras[{}].name", i);
            validate_name(&camera.name, &key)?;
            if !cameras.insert(camera.name.as_str()) {
                return Err(SceneError::config(key, format!("duplicate camera name '{}'", camera.name)));
            }
            if camera.config_base_dir.trim().is_empty() {
                return Err(SceneError::config(
                    format!("cameras[{}].config_base_dir", i),
                    "must not be empty",
                ));
            }
        }

        if let Some(station) = &self.station {
            self.require_model(&station.arm, "station.arm")?;
            self.require_model(&station.gripper, "station.gripper")?;
            validate_name(&station.arm_name, "station.arm_name")?;
            validate_name(&station.gripper_name, "station.gripper_name")?;
            if station.arm_name == station.gripper_name {
                return Err(SceneError::config(
                    "station.gripper_name",
                    "arm and gripper need different instance names",
                ));
            }
            station.gripper_mount_pose()?;
            if station.joint_seed.is_empty() || station.joint_seed.iter().any(|v| !v.is_finite()) {
                return Err(SceneError::config(
                    "station.joint_seed",
                    "must be a non-empty list of finite joint positions",
                ));
            }
            let period = station.channels.status_period;
            if !period.is_finite() || period <= 0.0 {
                return Err(SceneError::config(
                    "station.channels.status_period",
                    format!("must be a positive number, got {}", period),
                ));
            }
        }

        if let Some(payload) = &self.payload {
            self.require_model(&payload.model, "payload.model")?;
            validate_name(payload.instance_name(), "payload.name")?;
            payload.pose()?;
        }

        Ok(())
    }

    fn require_model(&self, class: &str, key: &str) -> SceneResult<()> {
        if self.models.contains_key(class) {
            Ok(())
        } else {
            Err(SceneError::config(
                key,
                format!("model class '{}' is not defined in `models`", class),
            ))
        }
    }

    pub fn simulation_params(&self) -> SimulationParams {
        SimulationParams {
            time_step: self.time_step,
            target_realtime_rate: self.target_realtime_rate.unwrap_or(DEFAULT_REALTIME_RATE),
            duration: self.duration.unwrap_or(DEFAULT_DURATION),
        }
    }
}

fn validate_name(name: &str, key: &str) -> SceneResult<()> {
    if name.trim().is_empty() {
        return Err(SceneError::config(key, "name must not be empty"));
    }
    if name.contains("::") {
        return Err(SceneError::config(
            key,
            format!("name '{}' must not contain '::'", name),
        ));
    }
    Ok(())
}

pub fn validate_realtime_rate(rate: f64, key: &str) -> SceneResult<()> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(SceneError::config(
            key,
            format!("must be a finite non-negative number, got {}", rate),
        ));
    }
    Ok(())
}

pub fn validate_duration(duration: f64, key: &str) -> SceneResult<()> {
    if duration.is_nan() || duration <= 0.0 {
        return Err(SceneError::config(
            key,
            format!("must be positive (or .inf), got {}", duration),
        ));
    }
    Ok(())
}

/// Parameters handed to the stepping runtime
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationParams {
    pub time_step: f64,
    pub target_realtime_rate: f64,
    pub duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
models:
  table: models/table.sdf
  brick: models/brick.urdf
instances:
  - model: table
    q0: [0.75, 0.0, -0.7645, 0.0, 0.0, 0.0]
    fixed: true
  - model: brick
    q0: [0.6, 0.0, 0.02, 0.0, 0.0, 0.0]
    fixed: false
time_step: 0.002
"#;

    fn config_key(err: SceneError) -> String {
        match err {
            SceneError::Config { key, .. } => key,
            other => panic!("expected config error, got {}", other),
        }
    }

    #[test]
    fn test_parse_minimal() {
        let config = SceneConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.models.len(), 2);
        assert_eq!(config.instances.len(), 2);
        assert!(config.instances[0].fixed);
        assert!(!config.instances[1].fixed);
        assert!(config.cameras.is_empty());
        assert!(config.station.is_none());
        assert_eq!(config.instances[1].pose().unwrap(), [0.6, 0.0, 0.02, 0.0, 0.0, 0.0]);

        let params = config.simulation_params();
        assert_eq!(params.time_step, 0.002);
        assert_eq!(params.target_realtime_rate, 1.0);
        assert!(params.duration.is_infinite());
    }

    #[test]
    fn test_unknown_model_class() {
        let text = MINIMAL.replace("- model: brick", "- model: sphere");
        let err = SceneConfig::from_yaml_str(&text).unwrap_err();
        assert_eq!(config_key(err), "instances[1].model");
    }

    #[test]
    fn test_missing_instances_key() {
        let err = SceneConfig::from_yaml_str("models: {}\ntime_step: 0.001\n").unwrap_err();
        assert_eq!(config_key(err), "instances");
    }

    #[test]
    fn test_missing_fixed_rejected() {
        let text = r#"
models: {table: models/table.sdf}
instances:
  - model: table
    q0: [0.75, 0.0, -0.7645, 0.0, 0.0, 0.0]
time_step: 0.002
"#;
        let err = SceneConfig::from_yaml_str(text).unwrap_err();
        assert_eq!(config_key(err), "instances[0].fixed");
    }

    #[test]
    fn test_misspelled_key_rejected() {
        let text = r#"
models: {table: models/table.sdf}
instances:
  - model: table
    q0: [0.75, 0.0, -0.7645, 0.0, 0.0, 0.0]
    fixd: true
time_step: 0.002
"#;
        let err = SceneConfig::from_yaml_str(text).unwrap_err();
        assert_eq!(config_key(err), "instances[0].fixd");

        let text = format!("{}time_stpe: 0.001\n", MINIMAL);
        assert_eq!(config_key(SceneConfig::from_yaml_str(&text).unwrap_err()), "time_stpe");

        let text = format!("{}station: {{arm: table, gripper: brick, gripper_mount_pose: []}}\n", MINIMAL);
        assert_eq!(
            config_key(SceneConfig::from_yaml_str(&text).unwrap_err()),
            "station.gripper_mount_pose"
        );
    }

    #[test]
    fn test_empty_instances_allowed() {
        let config = SceneConfig::from_yaml_str("models: {}\ninstances: []\ntime_step: 0.001\n").unwrap();
        assert!(config.instances.is_empty());
    }

    #[test]
    fn test_bad_time_step() {
        let text = MINIMAL.replace("time_step: 0.002", "time_step: -1.0");
        assert_eq!(config_key(SceneConfig::from_yaml_str(&text).unwrap_err()), "time_step");
    }

    #[test]
    fn test_short_pose_rejected() {
        let text = MINIMAL.replace("[0.6, 0.0, 0.02, 0.0, 0.0, 0.0]", "[0.6, 0.0, 0.02]");
        assert_eq!(config_key(SceneConfig::from_yaml_str(&text).unwrap_err()), "instances[1].q0");
    }

    #[test]
    fn test_duplicate_explicit_names() {
        let text = r#"
models:
  brick: brick.urdf
instances:
  - {name: a, model: brick, q0: [0, 0, 0, 0, 0, 0], fixed: false}
  - {name: a, model: brick, q0: [1, 0, 0, 0, 0, 0], fixed: false}
time_step: 0.001
"#;
        assert_eq!(config_key(SceneConfig::from_yaml_str(text).unwrap_err()), "instances[1].name");
    }

    #[test]
    fn test_infinite_duration_and_rate() {
        let text = format!("{}duration: .inf\ntarget_realtime_rate: 0.5\n", MINIMAL);
        let params = SceneConfig::from_yaml_str(&text).unwrap().simulation_params();
        assert!(params.duration.is_infinite());
        assert_eq!(params.target_realtime_rate, 0.5);

        let text = format!("{}duration: 0.0\n", MINIMAL);
        assert_eq!(config_key(SceneConfig::from_yaml_str(&text).unwrap_err()), "duration");
    }

    #[test]
    fn test_station_defaults() {
        let text = r#"
models:
  iiwa: iiwa.urdf
  wsg: wsg.urdf
instances: []
time_step: 0.002
station:
  arm: iiwa
  gripper: wsg
"#;
        let config = SceneConfig::from_yaml_str(text).unwrap();
        let station = config.station.unwrap();
        assert_eq!(station, StationConfig::new("iiwa", "wsg"));
        assert_eq!(station.joint_seed, vec![0.0, 0.6, 0.0, -1.75, 0.0, 1.0, 0.0]);
        assert_eq!(station.channels.command, "IIWA_COMMAND");
        assert_eq!(station.channels.status, "IIWA_STATUS");
        assert_eq!(station.channels.status_period, 0.005);
    }

    #[test]
    fn test_station_model_must_exist() {
        let text = r#"
models:
  iiwa: iiwa.urdf
instances: []
time_step: 0.002
station: {arm: iiwa, gripper: wsg}
"#;
        assert_eq!(config_key(SceneConfig::from_yaml_str(text).unwrap_err()), "station.gripper");
    }

    #[test]
    fn test_payload_defaults() {
        let text = format!("{}payload:\n  model: brick\n", MINIMAL);
        let config = SceneConfig::from_yaml_str(&text).unwrap();
        let payload = config.payload.unwrap();
        assert_eq!(payload.instance_name(), "brick");
        assert_eq!(payload.pose().unwrap(), DEFAULT_PAYLOAD_POSE);
    }

    #[test]
    fn test_parse_is_pure() {
        // Resource files are not touched at parse time
        let text = MINIMAL.replace("models/brick.urdf", "/does/not/exist.urdf");
        assert!(SceneConfig::from_yaml_str(&text).is_ok());
    }
}
