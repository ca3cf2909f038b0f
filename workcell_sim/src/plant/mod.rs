//! Physical model graph
//!
//! [`MultibodyPlant`] owns bodies, joints and model instances together with
//! their frame tree. Structure can only change while the plant is
//! [`Phase::Building`]; [`MultibodyPlant::finalize`] fixes the layout of the
//! state vector and unlocks state queries.

pub mod multibody;
pub mod state;

use std::fmt;

use serde::Serialize;

pub use multibody::{
    Attachment, Body, BodyIndex, FrameRef, InstanceId, Joint, JointIndex, ModelInstance,
    MultibodyPlant, WORLD_FRAME,
};
pub use state::PlantState;

/// Structural phase of a plant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Building,
    Finalized,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Building => write!(f, "building"),
            Phase::Finalized => write!(f, "finalized"),
        }
    }
}
