use std::collections::BTreeMap;

use super::multibody::InstanceId;
use crate::tf::RigidTransform;

/// Continuous state of a finalized plant.
///
/// Created by [`MultibodyPlant::default_state`](super::MultibodyPlant::default_state)
/// and written through the plant's setters, which check indices against
/// the plant layout.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantState {
    pub(crate) positions: Vec<f64>,
    pub(crate) velocities: Vec<f64>,
    pub(crate) free_poses: BTreeMap<InstanceId, RigidTransform>,
}

impl PlantState {
    pub(crate) fn zeros(num_positions: usize, free_instances: &[InstanceId]) -> Self {
        Self {
            positions: vec![0.0; num_positions],
            velocities: vec![0.0; num_positions],
            free_poses: free_instances
                .iter()
                .map(|id| (*id, RigidTransform::identity()))
                .collect(),
        }
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn velocities(&self) -> &[f64] {
        &self.velocities
    }

    /// World pose of a free instance's model frame
    pub fn free_pose(&self, instance: InstanceId) -> Option<&RigidTransform> {
        self.free_poses.get(&instance)
    }

    pub fn free_poses(&self) -> impl Iterator<Item = (InstanceId, &RigidTransform)> {
        self.free_poses.iter().map(|(id, pose)| (*id, pose))
    }
}
