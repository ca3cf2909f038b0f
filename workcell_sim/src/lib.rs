//! Workcell Sim - Scene Composition Engine
//!
//! Assembles a simulated manipulation work-cell from a declarative scene
//! file: model instances and welds, camera mounts from calibration files,
//! the typed component graph around the plant, and the initial state handed
//! to the stepping runtime.

pub mod config;
pub mod error;
pub mod graph;
pub mod plant;
pub mod robot;
pub mod scene;
pub mod sensors;
pub mod tf;

pub use config::SceneConfig;
pub use error::{SceneError, SceneResult};
pub use scene::{ComposedScene, SceneComposer};
