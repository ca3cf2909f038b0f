//! Initial-state injection
//!
//! Runs once on a finalized plant and a built graph, before the runtime's
//! first step. Writes the arm joint seed and the pose of every free
//! placement into a fresh [`SimulationContext`].

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::attachment::PlacementPlan;
use crate::error::{SceneError, SceneResult};
use crate::graph::{ComponentGraph, ComponentKind};
use crate::plant::{MultibodyPlant, PlantState};

/// Initial state handed to the stepping runtime
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationContext {
    plant_state: PlantState,
    /// Per-component initial values, keyed by component name
    component_states: BTreeMap<String, Vec<f64>>,
}

impl SimulationContext {
    pub fn new(plant_state: PlantState) -> Self {
        Self {
            plant_state,
            component_states: BTreeMap::new(),
        }
    }

    pub fn plant_state(&self) -> &PlantState {
        &self.plant_state
    }

    pub fn component_state(&self, component: &str) -> Option<&[f64]> {
        self.component_states.get(component).map(Vec::as_slice)
    }

    pub fn component_states(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.component_states
    }
}

/// Seed the arm and place every free instance.
///
/// The arm's positions are set to `joint_seed` with zero velocities, and the
/// command receiver starts from the same positions so the first command
/// holds the arm still. Free placements get exactly the transforms the
/// attachment pass resolved.
pub fn inject(
    plant: &MultibodyPlant,
    graph: &ComponentGraph,
    context: &mut SimulationContext,
    plan: &PlacementPlan,
    joint_seed: &[f64],
) -> SceneResult<()> {
    plant.ensure_finalized("inject")?;

    match &plan.station {
        Some(station) => {
            let arm = plant
                .instance_by_name(&station.arm.name)
                .ok_or_else(|| SceneError::unknown_frame(station.arm.name.clone()))?;

            let receiver = graph
                .find_component(|kind| matches!(kind, ComponentKind::CommandReceiver { .. }))
                .ok_or_else(|| SceneError::UnknownPort {
                    port: "command_receiver".to_string(),
                })?;
            let num_joints = match receiver.kind {
                ComponentKind::CommandReceiver { num_joints } => num_joints,
                _ => arm.num_positions(),
            };
            if joint_seed.len() != num_joints {
                return Err(SceneError::PortArity {
                    from: "joint_seed".to_string(),
                    from_width: joint_seed.len(),
                    to: format!("{}.arm_position", arm.name),
                    to_width: num_joints,
                });
            }

            plant.set_instance_positions(&mut context.plant_state, arm.id, joint_seed)?;
            plant.set_instance_velocities(
                &mut context.plant_state,
                arm.id,
                &vec![0.0; joint_seed.len()],
            )?;
            context
                .component_states
                .insert(receiver.name.clone(), joint_seed.to_vec());
            debug!("Seeded '{}' and '{}' with {:?}", arm.name, receiver.name, joint_seed);
        }
        None if !joint_seed.is_empty() => {
            return Err(SceneError::PortArity {
                from: "joint_seed".to_string(),
                from_width: joint_seed.len(),
                to: "plant.arm_position".to_string(),
                to_width: 0,
            });
        }
        None => {}
    }

    let mut placed = 0;
    for placement in plan.free_placements() {
        let instance = plant
            .instance_by_name(&placement.name)
            .ok_or_else(|| SceneError::unknown_frame(placement.name.clone()))?;
        plant.set_free_body_pose(&mut context.plant_state, instance.id, placement.transform)?;
        placed += 1;
    }

    info!(
        "Initial state injected: {} joint positions, {} free bodies placed",
        joint_seed.len(),
        placed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChannelConfig, SceneConfig};
    use crate::graph::{build_station_graph, ArmStation};
    use crate::plant::Phase;
    use crate::robot::description::JointDescription;
    use crate::robot::{JointKind, ModelDescription, ModelFormat};
    use crate::tf::{resolve, RigidTransform};
    use std::path::Path;

    fn block() -> ModelDescription {
        ModelDescription {
            name: "block".into(),
            format: ModelFormat::Urdf,
            bodies: vec!["base_link".into()],
            joints: vec![],
            root_body: "base_link".into(),
            root_pose: RigidTransform::identity(),
        }
    }

    fn two_joint_arm() -> ModelDescription {
        let joint = |name: &str, parent: &str, child: &str| JointDescription {
            name: name.into(),
            kind: JointKind::Revolute,
            parent: parent.into(),
            child: child.into(),
            origin: RigidTransform::from_translation([0.0, 0.0, 0.3]),
            pivot: RigidTransform::identity(),
            axis: [0.0, 0.0, 1.0],
        };
        ModelDescription {
            name: "arm".into(),
            format: ModelFormat::Urdf,
            bodies: vec!["link_0".into(), "link_1".into(), "link_2".into()],
            joints: vec![
                joint("joint_1", "link_0", "link_1"),
                joint("joint_2", "link_1", "link_2"),
            ],
            root_body: "link_0".into(),
            root_pose: RigidTransform::identity(),
        }
    }

    fn plan(text: &str) -> PlacementPlan {
        PlacementPlan::from_config(&SceneConfig::from_yaml_str(text).unwrap()).unwrap()
    }

    #[test]
    fn test_free_bodies_get_planned_transform() {
        let plan = plan(
            r#"
models: {block: block.urdf}
instances:
  - {model: block, q0: [0.75, 0, -0.7645, 0, 0, 0], fixed: true}
  - {model: block, q0: [0.6, 0, 0.02, 0, 0, 0.3], fixed: false}
time_step: 0.001
"#,
        );
        let mut plant = MultibodyPlant::new();
        let table = plant.add_model_instance("block_0", "block", Path::new("block.urdf"), &block()).unwrap();
        let brick = plant.add_model_instance("block_1", "block", Path::new("block.urdf"), &block()).unwrap();
        plant.weld_to_world(table, plan.instances[0].transform).unwrap();
        plant.finalize().unwrap();

        let graph = build_station_graph(None, &[]).unwrap();
        let mut context = SimulationContext::new(plant.default_state().unwrap());
        inject(&plant, &graph, &mut context, &plan, &[]).unwrap();

        let state = context.plant_state();
        assert_eq!(state.free_pose(brick), Some(&resolve(&[0.6, 0.0, 0.02, 0.0, 0.0, 0.3])));
        assert_eq!(state.free_pose(table), None);
        assert_eq!(
            plant.instance_world_pose(state, table).unwrap(),
            plan.instances[0].transform
        );
    }

    #[test]
    fn test_arm_seed_reaches_plant_and_receiver() {
        let plan = plan(
            r#"
models: {arm: arm.urdf, block: block.urdf}
instances: []
station: {arm: arm, gripper: block, gripper_parent_body: link_2, joint_seed: [0.1, -0.2]}
time_step: 0.001
"#,
        );
        let station = plan.station.as_ref().unwrap();
        let mut plant = MultibodyPlant::new();
        let arm = plant.add_model_instance("iiwa", "arm", Path::new("arm.urdf"), &two_joint_arm()).unwrap();
        let gripper = plant.add_model_instance("wsg", "block", Path::new("block.urdf"), &block()).unwrap();
        plant.weld_to_world(arm, station.arm.transform).unwrap();
        let parent = plant.resolve_frame(&station.gripper_parent).unwrap();
        plant.weld_frames(&parent, gripper, station.gripper.transform).unwrap();
        plant.finalize().unwrap();

        let channels = ChannelConfig::default();
        let graph = build_station_graph(Some(ArmStation { dof: 2, channels: &channels }), &[]).unwrap();
        let mut context = SimulationContext::new(plant.default_state().unwrap());
        inject(&plant, &graph, &mut context, &plan, &station.joint_seed).unwrap();

        assert_eq!(context.plant_state().positions(), &[0.1, -0.2]);
        assert_eq!(context.plant_state().velocities(), &[0.0, 0.0]);
        assert_eq!(
            context.component_state(crate::graph::station::COMMAND_RECEIVER),
            Some(&[0.1, -0.2][..])
        );
    }

    #[test]
    fn test_seed_width_mismatch() {
        let plan = plan(
            r#"
models: {arm: arm.urdf, block: block.urdf}
instances: []
station: {arm: arm, gripper: block, gripper_parent_body: link_2}
time_step: 0.001
"#,
        );
        let station = plan.station.as_ref().unwrap();
        let mut plant = MultibodyPlant::new();
        let arm = plant.add_model_instance("iiwa", "arm", Path::new("arm.urdf"), &two_joint_arm()).unwrap();
        plant.add_model_instance("wsg", "block", Path::new("block.urdf"), &block()).unwrap();
        plant.weld_to_world(arm, RigidTransform::identity()).unwrap();
        plant.finalize().unwrap();

        let channels = ChannelConfig::default();
        let graph = build_station_graph(Some(ArmStation { dof: 2, channels: &channels }), &[]).unwrap();
        let mut context = SimulationContext::new(plant.default_state().unwrap());
        let err = inject(&plant, &graph, &mut context, &plan, &station.joint_seed).unwrap_err();
        match err {
            SceneError::PortArity {
                from_width,
                to_width,
                ..
            } => assert_eq!((from_width, to_width), (7, 2)),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_requires_finalized_plant() {
        let plant = MultibodyPlant::new();
        let graph = build_station_graph(None, &[]).unwrap();
        let mut finalized = MultibodyPlant::new();
        finalized.finalize().unwrap();
        let mut context = SimulationContext::new(finalized.default_state().unwrap());

        let err = inject(&plant, &graph, &mut context, &PlacementPlan::default(), &[]).unwrap_err();
        assert!(matches!(
            err,
            SceneError::Phase {
                phase: Phase::Building,
                ..
            }
        ));
    }

    #[test]
    fn test_seed_without_arm_rejected() {
        let mut plant = MultibodyPlant::new();
        plant.finalize().unwrap();
        let graph = build_station_graph(None, &[]).unwrap();
        let mut context = SimulationContext::new(plant.default_state().unwrap());
        let err =
            inject(&plant, &graph, &mut context, &PlacementPlan::default(), &[0.0]).unwrap_err();
        assert!(matches!(err, SceneError::PortArity { to_width: 0, .. }));
    }
}
