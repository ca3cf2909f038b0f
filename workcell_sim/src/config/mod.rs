//! Declarative scene description and calibration inputs

pub mod calibration;
pub mod paths;
pub mod scene;

pub use calibration::{
    load_calibration, CameraInfoFile, ExtrinsicsFile, DEPTH_INTRINSICS_FILE, EXTRINSICS_FILE,
    RGB_INTRINSICS_FILE,
};
pub use paths::expand_path;
pub use scene::{
    validate_duration, validate_realtime_rate, ChannelConfig, InstanceSpec, PayloadConfig,
    SceneConfig, SensorSpec, SimulationParams, StationConfig, DEFAULT_DURATION,
    DEFAULT_PAYLOAD_POSE, DEFAULT_REALTIME_RATE,
};
