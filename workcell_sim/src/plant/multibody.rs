//! Multibody plant: bodies, joints, model instances and their frames
//!
//! Frame naming:
//! - `world`: the world body
//! - `<instance>`: canonical model frame of an instance
//! - `<instance>::<body>`: body frames
//!
//! A model frame hangs off the world with a floating motion until it is
//! welded, at which point it is reparented under the target body with a
//! fixed transform. Root bodies sit under their model frame at the root
//! offset reported by the loader.

use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::state::PlantState;
use super::Phase;
use crate::error::{SceneError, SceneResult};
use crate::robot::description::{find_root_body, JointKind, ModelDescription, ModelFormat};
use crate::tf::{FrameMotion, FrameNode, FrameTree, RigidTransform};

pub const WORLD_FRAME: &str = "world";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InstanceId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BodyIndex(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JointIndex(pub usize);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance #{}", self.0)
    }
}

/// Handle to a body frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameRef {
    pub body: BodyIndex,
    /// Qualified frame name (`world` or `<instance>::<body>`)
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub name: String,
    pub local_name: String,
    pub instance: Option<InstanceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    pub kind: JointKind,
    pub instance: InstanceId,
    pub parent: BodyIndex,
    pub child: BodyIndex,
    pub origin: RigidTransform,
    /// Joint frame in the child body
    pub pivot: RigidTransform,
    pub axis: [f64; 3],
    /// Slot in the position vector, assigned at finalization
    pub position_index: Option<usize>,
}

impl Joint {
    /// Child motion relative to the joint origin at position `q`.
    ///
    /// The axis motion happens in the joint frame, so it is conjugated by
    /// `pivot` to express it in the child body.
    pub fn motion(&self, q: f64) -> RigidTransform {
        let about_pivot = match self.kind {
            JointKind::Fixed => return RigidTransform::identity(),
            JointKind::Revolute | JointKind::Continuous => {
                RigidTransform::from_axis_angle(self.axis, q)
            }
            JointKind::Prismatic => {
                RigidTransform::from_translation([self.axis[0] * q, self.axis[1] * q, self.axis[2] * q])
            }
        };
        self.pivot.compose(&about_pivot).compose(&self.pivot.inverse())
    }
}

/// How an instance's model frame is held in place
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    /// Six-dof free body, pose lives in [`PlantState`]
    Free,
    Welded { to: FrameRef, at: RigidTransform },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    pub id: InstanceId,
    pub name: String,
    pub model_class: String,
    pub source: PathBuf,
    pub format: ModelFormat,
    pub root_body: BodyIndex,
    /// Root body pose in the model frame
    pub root_pose: RigidTransform,
    pub attachment: Attachment,
    pub bodies: Vec<BodyIndex>,
    pub joints: Vec<JointIndex>,
    position_start: usize,
    num_positions: usize,
}

impl ModelInstance {
    pub fn is_free(&self) -> bool {
        matches!(self.attachment, Attachment::Free)
    }

    pub fn num_positions(&self) -> usize {
        self.num_positions
    }

    /// Slice of the plant position vector owned by this instance
    pub fn position_range(&self) -> Range<usize> {
        self.position_start..self.position_start + self.num_positions
    }
}

/// The physical model graph
#[derive(Debug, Clone)]
pub struct MultibodyPlant {
    phase: Phase,
    bodies: Vec<Body>,
    joints: Vec<Joint>,
    instances: Vec<ModelInstance>,
    instance_names: HashMap<String, InstanceId>,
    body_names: HashMap<String, BodyIndex>,
    frames: FrameTree,
    num_positions: usize,
}

impl Default for MultibodyPlant {
    fn default() -> Self {
        Self::new()
    }
}

impl MultibodyPlant {
    pub fn new() -> Self {
        let world = Body {
            name: WORLD_FRAME.to_string(),
            local_name: WORLD_FRAME.to_string(),
            instance: None,
        };
        let mut body_names = HashMap::new();
        body_names.insert(WORLD_FRAME.to_string(), BodyIndex(0));

        Self {
            phase: Phase::Building,
            bodies: vec![world],
            joints: Vec::new(),
            instances: Vec::new(),
            instance_names: HashMap::new(),
            body_names,
            frames: FrameTree::new(WORLD_FRAME),
            num_positions: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == Phase::Finalized
    }

    pub(crate) fn ensure_building(&self, operation: &'static str) -> SceneResult<()> {
        match self.phase {
            Phase::Building => Ok(()),
            phase => Err(SceneError::Phase { operation, phase }),
        }
    }

    pub(crate) fn ensure_finalized(&self, operation: &'static str) -> SceneResult<()> {
        match self.phase {
            Phase::Finalized => Ok(()),
            phase => Err(SceneError::Phase { operation, phase }),
        }
    }

    pub fn world_frame(&self) -> FrameRef {
        FrameRef {
            body: BodyIndex(0),
            name: WORLD_FRAME.to_string(),
        }
    }

    pub fn frames(&self) -> &FrameTree {
        &self.frames
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, index: BodyIndex) -> Option<&Body> {
        self.bodies.get(index.0)
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn instances(&self) -> &[ModelInstance] {
        &self.instances
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn num_positions(&self) -> usize {
        self.num_positions
    }

    pub fn instance(&self, id: InstanceId) -> SceneResult<&ModelInstance> {
        self.instances
            .get(id.0)
            .ok_or_else(|| SceneError::unknown_frame(id.to_string()))
    }

    pub fn instance_by_name(&self, name: &str) -> Option<&ModelInstance> {
        self.instance_names
            .get(name)
            .and_then(|id| self.instances.get(id.0))
    }

    /// Add every body and joint of `description` as a new, free instance
    pub fn add_model_instance(
        &mut self,
        name: &str,
        model_class: &str,
        source: &Path,
        description: &ModelDescription,
    ) -> SceneResult<InstanceId> {
        self.ensure_building("add_model_instance")?;

        if name.is_empty() || name.contains("::") {
            return Err(SceneError::config(
                "instance name",
                format!("'{}' is not a valid instance name", name),
            ));
        }
        if self.instance_names.contains_key(name) || name == WORLD_FRAME {
            return Err(SceneError::NameCollision {
                kind: "instance",
                name: name.to_string(),
            });
        }

        // Validate the whole description before touching the plant
        let root = find_root_body(&description.bodies, &description.joints, source)?;
        if root != description.root_body {
            return Err(SceneError::model_load(
                source,
                format!(
                    "declared root '{}' does not match link tree root '{}'",
                    description.root_body, root
                ),
            ));
        }

        let id = InstanceId(self.instances.len());
        let qualify = |body: &str| format!("{}::{}", name, body);

        self.frames.add_frame(
            WORLD_FRAME,
            name,
            RigidTransform::identity(),
            FrameMotion::Floating(id.0),
        )?;

        let mut local_bodies = HashMap::new();
        let mut bodies = Vec::with_capacity(description.bodies.len());
        for body_name in &description.bodies {
            let index = BodyIndex(self.bodies.len());
            let qualified = qualify(body_name);
            self.bodies.push(Body {
                name: qualified.clone(),
                local_name: body_name.clone(),
                instance: Some(id),
            });
            self.body_names.insert(qualified, index);
            local_bodies.insert(body_name.as_str(), index);
            bodies.push(index);
        }

        let root_body = local_bodies[description.root_body.as_str()];
        self.frames.add_frame(
            name,
            &qualify(&description.root_body),
            description.root_pose,
            FrameMotion::Fixed,
        )?;

        let mut joints = Vec::with_capacity(description.joints.len());
        for joint in description.joints_in_tree_order() {
            let index = JointIndex(self.joints.len());
            let motion = match joint.kind.num_positions() {
                0 => FrameMotion::Fixed,
                _ => FrameMotion::Joint(index.0),
            };
            self.frames.add_frame(
                &qualify(&joint.parent),
                &qualify(&joint.child),
                joint.origin,
                motion,
            )?;
            self.joints.push(Joint {
                name: qualify(&joint.name),
                kind: joint.kind,
                instance: id,
                parent: local_bodies[joint.parent.as_str()],
                child: local_bodies[joint.child.as_str()],
                origin: joint.origin,
                pivot: joint.pivot,
                axis: joint.axis,
                position_index: None,
            });
            joints.push(index);
        }

        self.instances.push(ModelInstance {
            id,
            name: name.to_string(),
            model_class: model_class.to_string(),
            source: source.to_path_buf(),
            format: description.format,
            root_body,
            root_pose: description.root_pose,
            attachment: Attachment::Free,
            bodies,
            joints,
            position_start: 0,
            num_positions: description.num_positions(),
        });
        self.instance_names.insert(name.to_string(), id);

        debug!(
            "Added instance '{}' ({} bodies, {} joints) from {}",
            name,
            description.bodies.len(),
            description.joints.len(),
            source.display()
        );
        Ok(id)
    }

    /// Rigidly attach an instance's model frame to `parent` at `at`
    /// (pose of the model frame in `parent`).
    pub fn weld_frames(
        &mut self,
        parent: &FrameRef,
        instance: InstanceId,
        at: RigidTransform,
    ) -> SceneResult<()> {
        self.ensure_building("weld")?;

        let model = self.instance(instance)?;
        if let Attachment::Welded { to, .. } = &model.attachment {
            return Err(SceneError::InvalidWeld {
                child: model.name.clone(),
                parent: parent.name.clone(),
                reason: format!("instance is already welded to '{}'", to.name),
            });
        }
        let name = model.name.clone();

        self.frames
            .reparent(&name, &parent.name, at, FrameMotion::Fixed)?;
        self.instances[instance.0].attachment = Attachment::Welded {
            to: parent.clone(),
            at,
        };

        info!("Welded '{}' to '{}'", name, parent.name);
        Ok(())
    }

    pub fn weld_to_world(&mut self, instance: InstanceId, at: RigidTransform) -> SceneResult<()> {
        let world = self.world_frame();
        self.weld_frames(&world, instance, at)
    }

    /// Look a body up by `instance::body` or by a body name unique across
    /// instances.
    pub fn resolve_frame(&self, name: &str) -> SceneResult<FrameRef> {
        if let Some(&index) = self.body_names.get(name) {
            return Ok(FrameRef {
                body: index,
                name: self.bodies[index.0].name.clone(),
            });
        }
        if name.contains("::") {
            return Err(SceneError::unknown_frame(name));
        }

        let matches: Vec<(usize, &Body)> = self
            .bodies
            .iter()
            .enumerate()
            .filter(|(_, b)| b.instance.is_some() && b.local_name == name)
            .collect();

        match matches.as_slice() {
            [] => Err(SceneError::unknown_frame(name)),
            [(index, body)] => Ok(FrameRef {
                body: BodyIndex(*index),
                name: body.name.clone(),
            }),
            many => {
                let mut candidates: Vec<String> = many.iter().map(|(_, b)| b.name.clone()).collect();
                candidates.sort();
                Err(SceneError::AmbiguousFrame {
                    name: name.to_string(),
                    candidates,
                })
            }
        }
    }

    /// Freeze the structure and lay out the position vector
    pub fn finalize(&mut self) -> SceneResult<()> {
        self.ensure_building("finalize")?;

        let mut next = 0;
        for instance in &mut self.instances {
            instance.position_start = next;
            for joint_index in &instance.joints {
                let joint = &mut self.joints[joint_index.0];
                if joint.kind.num_positions() > 0 {
                    joint.position_index = Some(next);
                    next += joint.kind.num_positions();
                }
            }
        }
        self.num_positions = next;
        self.phase = Phase::Finalized;

        info!(
            "Plant finalized: {} instances, {} bodies, {} positions",
            self.instances.len(),
            self.bodies.len() - 1,
            self.num_positions
        );
        Ok(())
    }

    /// Zero joint positions and velocities, free bodies at the world origin
    pub fn default_state(&self) -> SceneResult<PlantState> {
        self.ensure_finalized("default_state")?;
        let free: Vec<InstanceId> = self
            .instances
            .iter()
            .filter(|i| i.is_free())
            .map(|i| i.id)
            .collect();
        Ok(PlantState::zeros(self.num_positions, &free))
    }

    pub fn set_instance_positions(
        &self,
        state: &mut PlantState,
        instance: InstanceId,
        positions: &[f64],
    ) -> SceneResult<()> {
        let range = self.state_range(state, instance, positions.len(), "positions")?;
        state.positions[range].copy_from_slice(positions);
        Ok(())
    }

    pub fn set_instance_velocities(
        &self,
        state: &mut PlantState,
        instance: InstanceId,
        velocities: &[f64],
    ) -> SceneResult<()> {
        let range = self.state_range(state, instance, velocities.len(), "velocities")?;
        state.velocities[range].copy_from_slice(velocities);
        Ok(())
    }

    fn state_range(
        &self,
        state: &PlantState,
        instance: InstanceId,
        width: usize,
        what: &str,
    ) -> SceneResult<Range<usize>> {
        self.ensure_finalized("set_state")?;
        self.check_state(state)?;
        let model = self.instance(instance)?;
        if width != model.num_positions {
            return Err(SceneError::PortArity {
                from: format!("{} {}", model.name, what),
                from_width: width,
                to: format!("{}.{}", model.name, what),
                to_width: model.num_positions,
            });
        }
        Ok(model.position_range())
    }

    /// Write the world pose of a free instance's model frame
    pub fn set_free_body_pose(
        &self,
        state: &mut PlantState,
        instance: InstanceId,
        pose: RigidTransform,
    ) -> SceneResult<()> {
        self.ensure_finalized("set_free_body_pose")?;
        let model = self.instance(instance)?;
        if let Attachment::Welded { to, .. } = &model.attachment {
            return Err(SceneError::InvalidWeld {
                child: model.name.clone(),
                parent: to.name.clone(),
                reason: "welded instances have no free pose".to_string(),
            });
        }
        match state.free_poses.get_mut(&instance) {
            Some(slot) => {
                *slot = pose;
                Ok(())
            }
            None => Err(SceneError::unknown_frame(model.name.clone())),
        }
    }

    fn check_state(&self, state: &PlantState) -> SceneResult<()> {
        if state.positions.len() != self.num_positions {
            return Err(SceneError::PortArity {
                from: "state.positions".to_string(),
                from_width: state.positions.len(),
                to: "plant.positions".to_string(),
                to_width: self.num_positions,
            });
        }
        Ok(())
    }

    fn frame_motion(&self, state: &PlantState, node: &FrameNode) -> RigidTransform {
        match node.motion {
            FrameMotion::Fixed => RigidTransform::identity(),
            FrameMotion::Joint(index) => self
                .joints
                .get(index)
                .and_then(|joint| {
                    let q = state.positions.get(joint.position_index?)?;
                    Some(joint.motion(*q))
                })
                .unwrap_or_default(),
            FrameMotion::Floating(index) => state
                .free_poses
                .get(&InstanceId(index))
                .copied()
                .unwrap_or_default(),
        }
    }

    /// World pose of any named frame for the given state
    pub fn frame_world_pose(&self, state: &PlantState, frame: &str) -> SceneResult<RigidTransform> {
        self.ensure_finalized("frame_world_pose")?;
        self.check_state(state)?;
        self.frames
            .world_pose_with(frame, |node| self.frame_motion(state, node))
    }

    /// World pose of an instance's canonical model frame
    pub fn instance_world_pose(
        &self,
        state: &PlantState,
        instance: InstanceId,
    ) -> SceneResult<RigidTransform> {
        let name = &self.instance(instance)?.name;
        self.frame_world_pose(state, name)
    }

    pub fn body_world_pose(&self, state: &PlantState, body: BodyIndex) -> SceneResult<RigidTransform> {
        let name = &self
            .body(body)
            .ok_or_else(|| SceneError::unknown_frame(format!("body #{}", body.0)))?
            .name;
        self.frame_world_pose(state, name)
    }

    /// Pose of `target` expressed in `source`
    pub fn relative_transform(
        &self,
        state: &PlantState,
        source: &str,
        target: &str,
    ) -> SceneResult<RigidTransform> {
        self.ensure_finalized("relative_transform")?;
        self.check_state(state)?;
        self.frames
            .lookup_transform_with(source, target, |node| self.frame_motion(state, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::description::JointDescription;
    use crate::tf::resolve;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn two_link_arm() -> ModelDescription {
        ModelDescription {
            name: "arm".into(),
            format: ModelFormat::Urdf,
            bodies: vec!["base".into(), "link_1".into(), "tip".into()],
            joints: vec![
                JointDescription {
                    name: "joint_1".into(),
                    kind: JointKind::Revolute,
                    parent: "base".into(),
                    child: "link_1".into(),
                    origin: RigidTransform::from_translation([0.0, 0.0, 0.5]),
                    pivot: RigidTransform::identity(),
                    axis: [0.0, 0.0, 1.0],
                },
                JointDescription {
                    name: "tip_weld".into(),
                    kind: JointKind::Fixed,
                    parent: "link_1".into(),
                    child: "tip".into(),
                    origin: RigidTransform::from_translation([1.0, 0.0, 0.0]),
                    pivot: RigidTransform::identity(),
                    axis: [1.0, 0.0, 0.0],
                },
            ],
            root_body: "base".into(),
            root_pose: RigidTransform::identity(),
        }
    }

    fn brick() -> ModelDescription {
        ModelDescription {
            name: "brick".into(),
            format: ModelFormat::Sdf,
            bodies: vec!["base_link".into()],
            joints: vec![],
            root_body: "base_link".into(),
            root_pose: RigidTransform::from_translation([0.0, 0.0, 0.025]),
        }
    }

    fn source() -> &'static Path {
        Path::new("test.urdf")
    }

    #[test]
    fn test_weld_to_world_is_exact() {
        let mut plant = MultibodyPlant::new();
        let table = plant.add_model_instance("table", "table", source(), &brick()).unwrap();
        let at = resolve(&[0.75, 0.0, -0.7645, 0.1, -0.2, 0.3]);
        plant.weld_to_world(table, at).unwrap();
        plant.finalize().unwrap();

        let state = plant.default_state().unwrap();
        assert_eq!(plant.instance_world_pose(&state, table).unwrap(), at);
        assert!(state.free_pose(table).is_none());
    }

    #[test]
    fn test_free_pose_round_trip() {
        let mut plant = MultibodyPlant::new();
        let brick_id = plant.add_model_instance("brick_0", "brick", source(), &brick()).unwrap();
        plant.finalize().unwrap();

        let mut state = plant.default_state().unwrap();
        let pose = resolve(&[0.6, 0.0, 0.02, 0.0, 0.0, 0.4]);
        plant.set_free_body_pose(&mut state, brick_id, pose).unwrap();
        assert_eq!(plant.instance_world_pose(&state, brick_id).unwrap(), pose);

        // Root body sits at the root offset inside the model frame
        let root = plant.instance(brick_id).unwrap().root_body;
        let body_pose = plant.body_world_pose(&state, root).unwrap();
        assert!(body_pose.approx_eq(&pose.compose(&brick().root_pose), 1e-12));
    }

    #[test]
    fn test_structure_locked_after_finalize() {
        let mut plant = MultibodyPlant::new();
        let arm = plant.add_model_instance("arm", "arm", source(), &two_link_arm()).unwrap();
        plant.finalize().unwrap();

        let err = plant.weld_to_world(arm, RigidTransform::identity()).unwrap_err();
        assert!(matches!(
            err,
            SceneError::Phase { operation: "weld", phase: Phase::Finalized }
        ));
        assert!(matches!(
            plant.add_model_instance("brick", "brick", source(), &brick()),
            Err(SceneError::Phase { .. })
        ));
        assert!(matches!(plant.finalize(), Err(SceneError::Phase { .. })));
    }

    #[test]
    fn test_state_requires_finalized_plant() {
        let plant = MultibodyPlant::new();
        assert!(matches!(
            plant.default_state(),
            Err(SceneError::Phase { phase: Phase::Building, .. })
        ));
    }

    #[test]
    fn test_duplicate_instance_name() {
        let mut plant = MultibodyPlant::new();
        plant.add_model_instance("brick", "brick", source(), &brick()).unwrap();
        let err = plant
            .add_model_instance("brick", "brick", source(), &brick())
            .unwrap_err();
        assert!(matches!(err, SceneError::NameCollision { kind: "instance", .. }));
        assert_eq!(plant.num_instances(), 1);
    }

    #[test]
    fn test_resolve_frame() {
        let mut plant = MultibodyPlant::new();
        plant.add_model_instance("arm", "arm", source(), &two_link_arm()).unwrap();
        plant.add_model_instance("brick_0", "brick", source(), &brick()).unwrap();
        plant.add_model_instance("brick_1", "brick", source(), &brick()).unwrap();

        assert_eq!(plant.resolve_frame("world").unwrap(), plant.world_frame());
        assert_eq!(plant.resolve_frame("tip").unwrap().name, "arm::tip");
        assert_eq!(
            plant.resolve_frame("brick_1::base_link").unwrap().name,
            "brick_1::base_link"
        );

        match plant.resolve_frame("base_link").unwrap_err() {
            SceneError::AmbiguousFrame { candidates, .. } => assert_eq!(
                candidates,
                vec!["brick_0::base_link".to_string(), "brick_1::base_link".to_string()]
            ),
            other => panic!("unexpected error: {}", other),
        }
        assert!(matches!(
            plant.resolve_frame("camera_mount"),
            Err(SceneError::UnknownFrame { name }) if name == "camera_mount"
        ));
        assert!(matches!(
            plant.resolve_frame("arm::camera_mount"),
            Err(SceneError::UnknownFrame { .. })
        ));
    }

    #[test]
    fn test_joint_positions_move_children() {
        let mut plant = MultibodyPlant::new();
        let arm = plant.add_model_instance("arm", "arm", source(), &two_link_arm()).unwrap();
        plant.weld_to_world(arm, RigidTransform::identity()).unwrap();
        plant.finalize().unwrap();
        assert_eq!(plant.num_positions(), 1);

        let mut state = plant.default_state().unwrap();
        plant.set_instance_positions(&mut state, arm, &[FRAC_PI_2]).unwrap();

        let tip = plant.resolve_frame("arm::tip").unwrap();
        let t = plant.body_world_pose(&state, tip.body).unwrap().translation();
        assert_relative_eq!(t[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(t[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(t[2], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_joint_turns_about_pivot() {
        let mut door = ModelDescription {
            name: "door".into(),
            format: ModelFormat::Sdf,
            bodies: vec!["frame".into(), "leaf".into()],
            joints: vec![JointDescription {
                name: "hinge".into(),
                kind: JointKind::Revolute,
                parent: "frame".into(),
                child: "leaf".into(),
                origin: RigidTransform::identity(),
                pivot: RigidTransform::from_translation([0.5, 0.0, 0.0]),
                axis: [0.0, 0.0, 1.0],
            }],
            root_body: "frame".into(),
            root_pose: RigidTransform::identity(),
        };
        let mut plant = MultibodyPlant::new();
        let id = plant.add_model_instance("door", "door", source(), &door).unwrap();
        plant.weld_to_world(id, RigidTransform::identity()).unwrap();
        plant.finalize().unwrap();

        let mut state = plant.default_state().unwrap();
        let closed = plant.frame_world_pose(&state, "door::leaf").unwrap();
        assert!(closed.approx_eq(&RigidTransform::identity(), 1e-12));

        plant.set_instance_positions(&mut state, id, &[PI]).unwrap();
        let open = plant.frame_world_pose(&state, "door::leaf").unwrap();
        let t = open.translation();
        assert_relative_eq!(t[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(t[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(t[2], 0.0, epsilon = 1e-12);

        // Prismatic joints are unaffected by where the pivot sits
        door.joints[0].kind = JointKind::Prismatic;
        door.joints[0].axis = [1.0, 0.0, 0.0];
        let mut plant = MultibodyPlant::new();
        let id = plant.add_model_instance("door", "door", source(), &door).unwrap();
        plant.finalize().unwrap();
        let mut state = plant.default_state().unwrap();
        plant.set_instance_positions(&mut state, id, &[0.25]).unwrap();
        let slid = plant.frame_world_pose(&state, "door::leaf").unwrap();
        assert!(slid.approx_eq(&RigidTransform::from_translation([0.25, 0.0, 0.0]), 1e-12));
    }

    #[test]
    fn test_mounted_instance_follows_parent() {
        let mut plant = MultibodyPlant::new();
        let arm = plant.add_model_instance("arm", "arm", source(), &two_link_arm()).unwrap();
        let tool = plant.add_model_instance("tool", "brick", source(), &brick()).unwrap();
        plant.weld_to_world(arm, RigidTransform::identity()).unwrap();
        let tip = plant.resolve_frame("arm::tip").unwrap();
        plant
            .weld_frames(&tip, tool, RigidTransform::from_translation([0.0, 0.0, 0.1]))
            .unwrap();
        plant.finalize().unwrap();

        let state = plant.default_state().unwrap();
        let pose = plant.instance_world_pose(&state, tool).unwrap();
        assert!(pose.approx_eq(&RigidTransform::from_translation([1.0, 0.0, 0.6]), 1e-12));

        let rel = plant.relative_transform(&state, "arm::tip", "tool").unwrap();
        assert!(rel.approx_eq(&RigidTransform::from_translation([0.0, 0.0, 0.1]), 1e-12));
    }

    #[test]
    fn test_weld_cycle_and_rewelding_rejected() {
        let mut plant = MultibodyPlant::new();
        let arm = plant.add_model_instance("arm", "arm", source(), &two_link_arm()).unwrap();
        let own_tip = plant.resolve_frame("arm::tip").unwrap();
        assert!(matches!(
            plant.weld_frames(&own_tip, arm, RigidTransform::identity()),
            Err(SceneError::InvalidWeld { .. })
        ));

        plant.weld_to_world(arm, RigidTransform::identity()).unwrap();
        assert!(matches!(
            plant.weld_to_world(arm, RigidTransform::identity()),
            Err(SceneError::InvalidWeld { .. })
        ));
    }

    #[test]
    fn test_position_width_checked() {
        let mut plant = MultibodyPlant::new();
        let arm = plant.add_model_instance("arm", "arm", source(), &two_link_arm()).unwrap();
        plant.finalize().unwrap();

        let mut state = plant.default_state().unwrap();
        let err = plant
            .set_instance_positions(&mut state, arm, &[0.0, 0.0])
            .unwrap_err();
        assert!(matches!(
            err,
            SceneError::PortArity { from_width: 2, to_width: 1, .. }
        ));
    }

    #[test]
    fn test_welded_instance_has_no_free_pose() {
        let mut plant = MultibodyPlant::new();
        let table = plant.add_model_instance("table", "table", source(), &brick()).unwrap();
        plant.weld_to_world(table, RigidTransform::identity()).unwrap();
        plant.finalize().unwrap();

        let mut state = plant.default_state().unwrap();
        assert!(plant
            .set_free_body_pose(&mut state, table, RigidTransform::identity())
            .is_err());
    }
}
