//! Placement plan and attachment pass
//!
//! Instance names and transforms are resolved once, up front, into a
//! [`PlacementPlan`]. The attachment pass (before finalization) and the
//! injection pass (after) both read the same plan, in the same order.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::config::{ChannelConfig, SceneConfig};
use crate::error::{SceneError, SceneResult};
use crate::plant::MultibodyPlant;
use crate::robot::ModelRegistry;
use crate::tf::{resolve, Pose6, RigidTransform};

/// A resolved placement of one instance
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub name: String,
    pub model_class: String,
    pub pose: Pose6,
    pub transform: RigidTransform,
    pub fixed: bool,
}

impl Placement {
    fn new(name: String, model_class: String, pose: Pose6, fixed: bool) -> Self {
        Self {
            name,
            model_class,
            pose,
            transform: resolve(&pose),
            fixed,
        }
    }
}

/// Arm welded at the world origin with a gripper on one of its bodies
#[derive(Debug, Clone, PartialEq)]
pub struct StationPlan {
    pub arm: Placement,
    pub gripper: Placement,
    /// Arm body carrying the gripper, qualified as `arm::body`
    pub gripper_parent: String,
    pub joint_seed: Vec<f64>,
    pub channels: ChannelConfig,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlacementPlan {
    pub station: Option<StationPlan>,
    pub instances: Vec<Placement>,
    pub payload: Option<Placement>,
}

impl PlacementPlan {
    /// Assign instance names (explicit or `<class>_<ordinal>`) and resolve
    /// every pose. Fails on the first duplicate name.
    pub fn from_config(config: &SceneConfig) -> SceneResult<Self> {
        let mut names = HashSet::new();
        let mut claim = |name: &str| -> SceneResult<()> {
            if names.insert(name.to_string()) {
                Ok(())
            } else {
                Err(SceneError::NameCollision {
                    kind: "instance",
                    name: name.to_string(),
                })
            }
        };

        let station = match &config.station {
            Some(station) => {
                claim(station.arm_name.as_str())?;
                claim(station.gripper_name.as_str())?;

                let gripper_parent = if station.gripper_parent_body.contains("::") {
                    station.gripper_parent_body.clone()
                } else {
                    format!("{}::{}", station.arm_name, station.gripper_parent_body)
                };
                Some(StationPlan {
                    arm: Placement::new(
                        station.arm_name.clone(),
                        station.arm.clone(),
                        [0.0; 6],
                        true,
                    ),
                    gripper: Placement::new(
                        station.gripper_name.clone(),
                        station.gripper.clone(),
                        station.gripper_mount_pose()?,
                        true,
                    ),
                    gripper_parent,
                    joint_seed: station.joint_seed.clone(),
                    channels: station.channels.clone(),
                })
            }
            None => None,
        };

        let mut ordinals: BTreeMap<&str, usize> = BTreeMap::new();
        let mut instances = Vec::with_capacity(config.instances.len());
        for spec in &config.instances {
            let ordinal = ordinals.entry(spec.model.as_str()).or_insert(0);
            let name = match &spec.name {
                Some(name) => name.clone(),
                None => format!("{}_{}", spec.model, ordinal),
            };
            *ordinal += 1;

            claim(name.as_str())?;
            instances.push(Placement::new(name, spec.model.clone(), spec.pose()?, spec.fixed));
        }

        let payload = match &config.payload {
            Some(payload) => {
                let name = payload.instance_name().to_string();
                claim(name.as_str())?;
                Some(Placement::new(name, payload.model.clone(), payload.pose()?, false))
            }
            None => None,
        };

        Ok(Self {
            station,
            instances,
            payload,
        })
    }

    /// Every placement in attachment order
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.station
            .iter()
            .flat_map(|s| [&s.arm, &s.gripper])
            .chain(self.instances.iter())
            .chain(self.payload.iter())
    }

    /// Placements whose pose is injected after finalization
    pub fn free_placements(&self) -> impl Iterator<Item = &Placement> {
        self.placements().filter(|p| !p.fixed)
    }

    /// Instantiate every placement and weld the fixed ones.
    ///
    /// All model classes are checked before the first instance is created.
    pub fn attach(&self, plant: &mut MultibodyPlant, registry: &ModelRegistry) -> SceneResult<()> {
        plant.ensure_building("attach")?;
        for placement in self.placements() {
            registry.path(&placement.model_class)?;
        }

        if let Some(station) = &self.station {
            let arm = registry.instantiate(plant, &station.arm.model_class, &station.arm.name)?;
            plant.weld_to_world(arm, station.arm.transform)?;

            let gripper =
                registry.instantiate(plant, &station.gripper.model_class, &station.gripper.name)?;
            let parent = plant.resolve_frame(&station.gripper_parent)?;
            plant.weld_frames(&parent, gripper, station.gripper.transform)?;
        }

        for placement in self.instances.iter().chain(self.payload.iter()) {
            let id = registry.instantiate(plant, &placement.model_class, &placement.name)?;
            if placement.fixed {
                plant.weld_to_world(id, placement.transform)?;
            } else {
                debug!("'{}' left free for initial-state injection", placement.name);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(text: &str) -> SceneConfig {
        SceneConfig::from_yaml_str(text).unwrap()
    }

    #[test]
    fn test_default_names_are_distinct() {
        let plan = PlacementPlan::from_config(&config(
            r#"
models: {brick: brick.urdf, table: table.sdf}
instances:
  - {model: brick, q0: [0, 0, 0, 0, 0, 0], fixed: false}
  - {model: table, q0: [1, 0, 0, 0, 0, 0], fixed: true}
  - {model: brick, q0: [0, 1, 0, 0, 0, 0], fixed: false}
time_step: 0.001
"#,
        ))
        .unwrap();
        let names: Vec<&str> = plan.instances.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["brick_0", "table_0", "brick_1"]);
        assert_eq!(plan.free_placements().count(), 2);
    }

    #[test]
    fn test_explicit_name_collides_with_default() {
        let err = PlacementPlan::from_config(&config(
            r#"
models: {brick: brick.urdf}
instances:
  - {name: brick_1, model: brick, q0: [0, 0, 0, 0, 0, 0], fixed: false}
  - {model: brick, q0: [0, 1, 0, 0, 0, 0], fixed: false}
time_step: 0.001
"#,
        ))
        .unwrap_err();
        assert!(matches!(err, SceneError::NameCollision { name, .. } if name == "brick_1"));
    }

    #[test]
    fn test_transforms_resolved_once() {
        let plan = PlacementPlan::from_config(&config(
            r#"
models: {brick: brick.urdf}
instances:
  - {model: brick, q0: [0.6, 0.0, 0.02, 0.1, 0.2, 0.3], fixed: false}
payload: {model: brick, q0: [0.5, 0.1, 0.0, 0.0, 0.0, 1.0]}
time_step: 0.001
"#,
        ))
        .unwrap();
        let brick = &plan.instances[0];
        assert_eq!(brick.transform, resolve(&brick.pose));

        let payload = plan.payload.as_ref().unwrap();
        assert_eq!(payload.name, "brick");
        assert!(!payload.fixed);
        assert_eq!(plan.free_placements().count(), 2);
    }

    #[test]
    fn test_station_placements_come_first() {
        let plan = PlacementPlan::from_config(&config(
            r#"
models: {iiwa: iiwa.urdf, wsg: wsg.urdf, brick: brick.urdf}
instances:
  - {model: brick, q0: [0.6, 0, 0, 0, 0, 0], fixed: false}
station: {arm: iiwa, gripper: wsg}
time_step: 0.001
"#,
        ))
        .unwrap();
        let names: Vec<&str> = plan.placements().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["iiwa", "wsg", "brick_0"]);
        assert_eq!(plan.station.as_ref().unwrap().gripper_parent, "iiwa::iiwa_link_7");
    }

    #[test]
    fn test_missing_class_instantiates_nothing() {
        let mut plan = PlacementPlan::from_config(&config(
            r#"
models: {brick: brick.urdf}
instances:
  - {model: brick, q0: [0, 0, 0, 0, 0, 0], fixed: false}
time_step: 0.001
"#,
        ))
        .unwrap();
        plan.instances[0].model_class = "sphere".into();

        let registry = ModelRegistry::new();
        let mut plant = MultibodyPlant::new();
        let err = plan.attach(&mut plant, &registry).unwrap_err();
        assert!(matches!(err, SceneError::Config { .. }));
        assert_eq!(plant.num_instances(), 0);
    }
}
