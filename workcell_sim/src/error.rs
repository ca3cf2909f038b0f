//! Composition errors
//!
//! Every failure the engine can report is raised while the scene is being
//! composed, before the runtime takes its first step. Each variant carries
//! the offending key, instance, port or file so the message alone is enough
//! to locate the problem, and [`SceneError::hint`] adds a short suggestion
//! for the command line.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::plant::Phase;

/// Errors raised while composing a work-cell scene
#[derive(Debug, Error)]
pub enum SceneError {
    /// Missing or malformed configuration key
    #[error("config error at '{key}': {reason}")]
    Config { key: String, reason: String },

    /// Reference to a body or frame that is not in the plant
    #[error("unknown frame '{name}'")]
    UnknownFrame { name: String },

    /// Unqualified body name that exists in more than one instance
    #[error("frame '{name}' is ambiguous, candidates: {}", candidates.join(", "))]
    AmbiguousFrame { name: String, candidates: Vec<String> },

    /// Duplicate instance, component or exported port name
    #[error("{kind} name '{name}' is already in use")]
    NameCollision { kind: &'static str, name: String },

    /// Port widths disagree
    #[error("port arity mismatch: '{from}' has width {from_width} but '{to}' expects {to_width}")]
    PortArity {
        from: String,
        from_width: usize,
        to: String,
        to_width: usize,
    },

    /// Vector port connected to an abstract-valued port (or two different abstract types)
    #[error("port type mismatch: '{from}' carries {from_type} but '{to}' expects {to_type}")]
    PortType {
        from: String,
        from_type: String,
        to: String,
        to_type: String,
    },

    /// Input port driven twice
    #[error("input port '{port}' is already connected to '{source_port}'")]
    PortAlreadyConnected { port: String, source_port: String },

    /// Component or port lookup failed
    #[error("unknown port '{port}'")]
    UnknownPort { port: String },

    /// Sensor calibration file absent or malformed
    #[error("missing calibration '{}': {reason}", path.display())]
    MissingCalibration { path: PathBuf, reason: String },

    /// Model resource could not be read or understood
    #[error("failed to load model '{}': {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// Weld that the kinematic tree cannot accept
    #[error("cannot weld '{child}' to '{parent}': {reason}")]
    InvalidWeld {
        child: String,
        parent: String,
        reason: String,
    },

    /// Operation attempted in the wrong plant phase
    #[error("'{operation}' is not allowed while the plant is {phase}")]
    Phase { operation: &'static str, phase: Phase },
}

/// Result type for composition operations
pub type SceneResult<T> = Result<T, SceneError>;

impl SceneError {
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Config {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_frame(name: impl Into<String>) -> Self {
        Self::UnknownFrame { name: name.into() }
    }

    pub fn model_load(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn missing_calibration(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::MissingCalibration {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Convert a YAML deserialization failure of the scene file into a
    /// config error that names the offending key where serde reports one.
    pub fn from_yaml(err: &serde_yaml::Error) -> Self {
        let message = err.to_string();
        let key = key_from_serde_message(&message).unwrap_or_else(|| "<document>".to_string());

        // serde_yaml already appends "at line L column C" when it knows the position
        Self::Config {
            key,
            reason: message,
        }
    }

    /// Short suggestion printed under the error by the CLI
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Config { .. } => Some(
                "Required keys are `models`, `instances` and `time_step`; every instance `model` must name an entry of `models`",
            ),
            Self::UnknownFrame { .. } => Some(
                "Body names come from the model files; qualify them as `instance::body` to pick a specific instance",
            ),
            Self::AmbiguousFrame { .. } => Some("Qualify the body name as `instance::body`"),
            Self::NameCollision { .. } => Some(
                "Give each instance an explicit `name`, or leave it out to get `<model>_<ordinal>`",
            ),
            Self::MissingCalibration { .. } => Some(
                "Each camera `config_base_dir` needs camera_info.yaml, rgb_camera_info.yaml and depth_camera_info.yaml",
            ),
            Self::ModelLoad { .. } => Some(
                "Supported model formats are URDF (.urdf) and SDF (.sdf); check environment variables used in the path",
            ),
            Self::Phase { .. } => Some(
                "Instances and welds must be added before the plant is finalized; state is injected after",
            ),
            Self::InvalidWeld { .. }
            | Self::PortArity { .. }
            | Self::PortType { .. }
            | Self::PortAlreadyConnected { .. }
            | Self::UnknownPort { .. } => None,
        }
    }
}

/// Pull the key path out of serde messages such as "missing field `time_step`"
/// or "instances[0]: missing field `model`".
fn key_from_serde_message(message: &str) -> Option<String> {
    let (path, detail) = match message.split_once(": ") {
        Some((path, detail)) if !path.contains(' ') => (Some(path), detail),
        _ => (None, message),
    };

    let field = if detail.starts_with("missing field") || detail.starts_with("unknown field") {
        detail.split('`').nth(1)
    } else {
        None
    };

    match (path, field) {
        (Some(path), Some(field)) => Some(format!("{}.{}", path, field)),
        (None, Some(field)) => Some(field.to_string()),
        (Some(path), None) => Some(path.to_string()),
        (None, None) => None,
    }
}
