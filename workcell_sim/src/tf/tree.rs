//! Frame tree - kinematic hierarchy of a plant
//!
//! Each node stores the transform from its parent at zero configuration plus
//! a [`FrameMotion`] tag telling the owner how the node moves with state.
//! Transform lookup walks to the common ancestor like a regular TF tree;
//! the per-node motion is supplied by the caller.

use std::collections::HashMap;

use super::transform::RigidTransform;
use crate::error::{SceneError, SceneResult};

/// How a frame moves relative to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMotion {
    /// Rigidly attached
    Fixed,
    /// Driven by a one-dof joint, indexed into the plant's joint table
    Joint(usize),
    /// Six-dof free body, indexed into the plant's instance table
    Floating(usize),
}

/// A node in the frame tree
#[derive(Debug, Clone)]
pub struct FrameNode {
    pub name: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    /// Pose in the parent frame before `motion` is applied
    pub transform: RigidTransform,
    pub motion: FrameMotion,
}

/// Tree of named frames rooted at the world frame
#[derive(Debug, Clone)]
pub struct FrameTree {
    frames: HashMap<String, FrameNode>,
    root: String,
}

impl Default for FrameTree {
    fn default() -> Self {
        Self::new("world")
    }
}

impl FrameTree {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let mut frames = HashMap::new();
        frames.insert(
            root.clone(),
            FrameNode {
                name: root.clone(),
                parent: None,
                children: Vec::new(),
                transform: RigidTransform::identity(),
                motion: FrameMotion::Fixed,
            },
        );

        Self { frames, root }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn has_frame(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn get_frame(&self, name: &str) -> Option<&FrameNode> {
        self.frames.get(name)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Add `child` under `parent`
    pub fn add_frame(
        &mut self,
        parent: &str,
        child: &str,
        transform: RigidTransform,
        motion: FrameMotion,
    ) -> SceneResult<()> {
        if !self.frames.contains_key(parent) {
            return Err(SceneError::unknown_frame(parent));
        }
        if self.frames.contains_key(child) {
            return Err(SceneError::NameCollision {
                kind: "frame",
                name: child.to_string(),
            });
        }

        self.frames.insert(
            child.to_string(),
            FrameNode {
                name: child.to_string(),
                parent: Some(parent.to_string()),
                children: Vec::new(),
                transform,
                motion,
            },
        );
        if let Some(parent_frame) = self.frames.get_mut(parent) {
            parent_frame.children.push(child.to_string());
        }

        Ok(())
    }

    /// Move `child` (and its subtree) under `new_parent` with a new transform
    pub fn reparent(
        &mut self,
        child: &str,
        new_parent: &str,
        transform: RigidTransform,
        motion: FrameMotion,
    ) -> SceneResult<()> {
        if !self.frames.contains_key(new_parent) {
            return Err(SceneError::unknown_frame(new_parent));
        }
        if self.is_ancestor(child, new_parent) {
            return Err(SceneError::InvalidWeld {
                child: child.to_string(),
                parent: new_parent.to_string(),
                reason: "attachment would create a cycle".to_string(),
            });
        }

        let old_parent = self
            .frames
            .get(child)
            .ok_or_else(|| SceneError::unknown_frame(child))?
            .parent
            .clone();

        if let Some(old_parent) = old_parent {
            if let Some(frame) = self.frames.get_mut(&old_parent) {
                frame.children.retain(|c| c != child);
            }
        }
        if let Some(frame) = self.frames.get_mut(new_parent) {
            frame.children.push(child.to_string());
        }
        if let Some(frame) = self.frames.get_mut(child) {
            frame.parent = Some(new_parent.to_string());
            frame.transform = transform;
            frame.motion = motion;
        }

        Ok(())
    }

    /// True if `ancestor` is `frame` or lies on its path to the root
    pub fn is_ancestor(&self, ancestor: &str, frame: &str) -> bool {
        let mut current = Some(frame);
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            current = self.frames.get(name).and_then(|f| f.parent.as_deref());
        }
        false
    }

    /// Frames from `name` up to and including the root
    pub fn path_to_root(&self, name: &str) -> SceneResult<Vec<&FrameNode>> {
        let mut path = Vec::new();
        let mut current = self
            .frames
            .get(name)
            .ok_or_else(|| SceneError::unknown_frame(name))?;

        loop {
            path.push(current);
            match &current.parent {
                Some(parent) => {
                    current = self
                        .frames
                        .get(parent)
                        .ok_or_else(|| SceneError::unknown_frame(parent))?;
                }
                None => break,
            }
        }

        Ok(path)
    }

    /// Pose of `name` in the root frame.
    ///
    /// `motion` maps a node to the transform applied after its fixed offset
    /// (joint rotation, free-body pose, or identity).
    pub fn world_pose_with<F>(&self, name: &str, motion: F) -> SceneResult<RigidTransform>
    where
        F: Fn(&FrameNode) -> RigidTransform,
    {
        let path = self.path_to_root(name)?;
        let mut pose = RigidTransform::identity();
        for frame in path.iter().rev() {
            pose = pose.compose(&frame.transform).compose(&motion(frame));
        }
        Ok(pose)
    }

    /// Pose of `target` expressed in `source`, i.e. `X_source_target`
    pub fn lookup_transform_with<F>(
        &self,
        source: &str,
        target: &str,
        motion: F,
    ) -> SceneResult<RigidTransform>
    where
        F: Fn(&FrameNode) -> RigidTransform,
    {
        if source == target {
            return Ok(RigidTransform::identity());
        }
        let world_source = self.world_pose_with(source, &motion)?;
        let world_target = self.world_pose_with(target, &motion)?;
        Ok(world_source.inverse().compose(&world_target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fixed(_: &FrameNode) -> RigidTransform {
        RigidTransform::identity()
    }

    #[test]
    fn test_add_and_lookup() {
        let mut tree = FrameTree::default();
        tree.add_frame(
            "world",
            "base",
            RigidTransform::from_translation([1.0, 0.0, 0.0]),
            FrameMotion::Fixed,
        )
        .unwrap();
        tree.add_frame(
            "base",
            "tool",
            RigidTransform::from_translation([0.0, 0.5, 0.0]),
            FrameMotion::Fixed,
        )
        .unwrap();

        assert_eq!(tree.root(), "world");
        assert!(tree.has_frame("tool"));
        assert_eq!(tree.frame_count(), 3);

        let pose = tree.world_pose_with("tool", fixed).unwrap();
        assert_eq!(pose.translation(), [1.0, 0.5, 0.0]);

        let rel = tree.lookup_transform_with("tool", "base", fixed).unwrap();
        assert_relative_eq!(rel.translation()[1], -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_unknown_parent() {
        let mut tree = FrameTree::default();
        let err = tree
            .add_frame("missing", "a", RigidTransform::identity(), FrameMotion::Fixed)
            .unwrap_err();
        assert!(matches!(err, SceneError::UnknownFrame { name } if name == "missing"));
    }

    #[test]
    fn test_duplicate_frame() {
        let mut tree = FrameTree::default();
        tree.add_frame("world", "a", RigidTransform::identity(), FrameMotion::Fixed)
            .unwrap();
        let err = tree
            .add_frame("world", "a", RigidTransform::identity(), FrameMotion::Fixed)
            .unwrap_err();
        assert!(matches!(err, SceneError::NameCollision { .. }));
    }

    #[test]
    fn test_reparent_rejects_cycle() {
        let mut tree = FrameTree::default();
        tree.add_frame("world", "a", RigidTransform::identity(), FrameMotion::Fixed)
            .unwrap();
        tree.add_frame("a", "b", RigidTransform::identity(), FrameMotion::Fixed)
            .unwrap();

        assert!(tree
            .reparent("a", "b", RigidTransform::identity(), FrameMotion::Fixed)
            .is_err());

        tree.add_frame("world", "c", RigidTransform::identity(), FrameMotion::Fixed)
            .unwrap();
        tree.reparent("b", "c", RigidTransform::identity(), FrameMotion::Fixed)
            .unwrap();
        assert!(tree.get_frame("a").unwrap().children.is_empty());
        assert_eq!(tree.get_frame("c").unwrap().children, vec!["b".to_string()]);
    }
}
