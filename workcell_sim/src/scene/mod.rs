//! Scene composition pipeline
//!
//! - [`attachment`]: placement plan, instantiation and welds (plant building)
//! - [`injection`]: initial state for free bodies and the arm (plant finalized)
//! - [`composition`]: the end-to-end [`SceneComposer`]

pub mod attachment;
pub mod composition;
pub mod injection;

pub use attachment::{Placement, PlacementPlan, StationPlan};
pub use composition::{CameraReport, ComposedScene, InstanceReport, SceneComposer, SceneReport};
pub use injection::{inject, SimulationContext};
