//! Format-independent model description
//!
//! Both loaders produce a [`ModelDescription`]; the plant never sees URDF or
//! SDF types directly.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{SceneError, SceneResult};
use crate::tf::RigidTransform;

/// Source format of a model resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Urdf,
    Sdf,
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFormat::Urdf => write!(f, "URDF"),
            ModelFormat::Sdf => write!(f, "SDF"),
        }
    }
}

/// Joint types the plant understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JointKind {
    Fixed,
    Revolute,
    Continuous,
    Prismatic,
}

impl JointKind {
    pub fn num_positions(&self) -> usize {
        match self {
            JointKind::Fixed => 0,
            JointKind::Revolute | JointKind::Continuous | JointKind::Prismatic => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JointDescription {
    pub name: String,
    pub kind: JointKind,
    pub parent: String,
    pub child: String,
    /// Child body pose in the parent body at zero position
    pub origin: RigidTransform,
    /// Joint frame in the child body. The joint moves about this frame;
    /// identity for URDF, where the joint frame is the child frame.
    pub pivot: RigidTransform,
    /// Motion axis, expressed in the joint frame
    pub axis: [f64; 3],
}

/// Bodies and joints of one model, rooted at a single body
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescription {
    pub name: String,
    pub format: ModelFormat,
    pub bodies: Vec<String>,
    pub joints: Vec<JointDescription>,
    pub root_body: String,
    /// Root body pose in the canonical model frame
    pub root_pose: RigidTransform,
}

impl ModelDescription {
    pub fn num_positions(&self) -> usize {
        self.joints.iter().map(|j| j.kind.num_positions()).sum()
    }

    pub fn has_body(&self, name: &str) -> bool {
        self.bodies.iter().any(|b| b == name)
    }

    /// Joints ordered so that every parent body is reached before its children
    pub fn joints_in_tree_order(&self) -> Vec<&JointDescription> {
        let mut by_parent: HashMap<&str, Vec<&JointDescription>> = HashMap::new();
        for joint in &self.joints {
            by_parent.entry(joint.parent.as_str()).or_default().push(joint);
        }

        let mut ordered = Vec::with_capacity(self.joints.len());
        let mut queue = VecDeque::from([self.root_body.as_str()]);
        while let Some(body) = queue.pop_front() {
            if let Some(joints) = by_parent.get(body) {
                for joint in joints {
                    ordered.push(*joint);
                    queue.push_back(joint.child.as_str());
                }
            }
        }
        ordered
    }
}

/// Find the unique body that is never a joint child and check that every
/// other body hangs off it through exactly one joint.
pub fn find_root_body(
    bodies: &[String],
    joints: &[JointDescription],
    source: &Path,
) -> SceneResult<String> {
    if bodies.is_empty() {
        return Err(SceneError::model_load(source, "model has no links"));
    }

    let known: HashSet<&str> = bodies.iter().map(String::as_str).collect();
    if known.len() != bodies.len() {
        return Err(SceneError::model_load(source, "duplicate link names"));
    }

    let mut children = HashSet::new();
    for joint in joints {
        for link in [&joint.parent, &joint.child] {
            if !known.contains(link.as_str()) {
                return Err(SceneError::model_load(
                    source,
                    format!("joint '{}' references unknown link '{}'", joint.name, link),
                ));
            }
        }
        if !children.insert(joint.child.as_str()) {
            return Err(SceneError::model_load(
                source,
                format!("link '{}' is the child of more than one joint", joint.child),
            ));
        }
    }

    let roots: Vec<&String> = bodies
        .iter()
        .filter(|b| !children.contains(b.as_str()))
        .collect();
    let root = match roots.as_slice() {
        [root] => (*root).clone(),
        [] => {
            return Err(SceneError::model_load(source, "link tree has no root (cycle)"));
        }
        many => {
            let names: Vec<&str> = many.iter().map(|s| s.as_str()).collect();
            return Err(SceneError::model_load(
                source,
                format!("link tree is disconnected, candidate roots: {}", names.join(", ")),
            ));
        }
    };

    // A unique root can still leave a detached cycle behind
    let mut reached = HashSet::from([root.as_str()]);
    let mut queue = VecDeque::from([root.as_str()]);
    while let Some(body) = queue.pop_front() {
        for joint in joints.iter().filter(|j| j.parent == body) {
            if reached.insert(joint.child.as_str()) {
                queue.push_back(joint.child.as_str());
            }
        }
    }
    if reached.len() != bodies.len() {
        return Err(SceneError::model_load(
            source,
            "link tree is disconnected from its root",
        ));
    }

    Ok(root)
}

/// A model file format the registry can load
pub trait ModelParser {
    fn format(&self) -> ModelFormat;

    /// Lowercase file extensions handled by this parser, without the dot
    fn extensions(&self) -> &'static [&'static str];

    fn parse(&self, text: &str, source: &Path) -> SceneResult<ModelDescription>;
}
