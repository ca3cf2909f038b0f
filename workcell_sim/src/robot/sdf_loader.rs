//! SDF model loading
//!
//! Only the kinematic skeleton is read: `<model>`, its `<link>` poses and
//! the `<joint>` elements connecting them. Link poses are expressed in the
//! model frame, the canonical frame of an SDF instance, unless a
//! `relative_to` attribute names another link. A joint's own `<pose>` places
//! the joint frame in its child link; joints rotate and slide about that
//! frame, and their axis is expressed in it unless the axis says otherwise.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use nalgebra::Vector3;

use super::description::{
    find_root_body, JointDescription, JointKind, ModelDescription, ModelFormat, ModelParser,
};
use crate::error::{SceneError, SceneResult};
use crate::tf::{resolve, RigidTransform};

/// Reserved name of the model frame in `relative_to` and `expressed_in`
const MODEL_FRAME: &str = "__model__";

#[derive(Debug, Default, Clone, Copy)]
pub struct SdfParser;

impl ModelParser for SdfParser {
    fn format(&self) -> ModelFormat {
        ModelFormat::Sdf
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["sdf"]
    }

    fn parse(&self, text: &str, source: &Path) -> SceneResult<ModelDescription> {
        let doc = roxmltree::Document::parse(text)
            .map_err(|e| SceneError::model_load(source, format!("invalid XML: {}", e)))?;

        let root = doc.root_element();
        let model = if root.has_tag_name("model") {
            root
        } else {
            root.children()
                .find(|n| n.has_tag_name("model"))
                .ok_or_else(|| SceneError::model_load(source, "no <model> element"))?
        };

        parse_model(model, source)
    }
}

/// Link poses as written, each relative to the model frame or another link
struct LinkFrames<'a> {
    declared: HashMap<String, (RigidTransform, Option<String>)>,
    source: &'a Path,
}

impl LinkFrames<'_> {
    fn contains(&self, link: &str) -> bool {
        self.declared.contains_key(link)
    }

    /// Pose of a named frame in the model frame; `__model__` is the identity
    fn in_model(&self, frame: &str) -> SceneResult<RigidTransform> {
        let mut pose = RigidTransform::identity();
        let mut current = frame;
        let mut visited = HashSet::new();
        while current != MODEL_FRAME {
            if !visited.insert(current) {
                return Err(SceneError::model_load(
                    self.source,
                    format!("pose of link '{}' is relative to itself through '{}'", frame, current),
                ));
            }
            let (local, relative_to) = self.declared.get(current).ok_or_else(|| {
                SceneError::model_load(
                    self.source,
                    format!("pose is relative to unknown frame '{}'", current),
                )
            })?;
            pose = local.compose(&pose);
            current = relative_to.as_deref().unwrap_or(MODEL_FRAME);
        }
        Ok(pose)
    }

    /// Like [`Self::in_model`], but unknown links are left to the tree check
    fn link_in_model(&self, link: &str) -> SceneResult<RigidTransform> {
        if self.contains(link) {
            self.in_model(link)
        } else {
            Ok(RigidTransform::identity())
        }
    }
}

fn parse_model(elem: roxmltree::Node, source: &Path) -> SceneResult<ModelDescription> {
    let name = elem
        .attribute("name")
        .ok_or_else(|| SceneError::model_load(source, "<model> has no name"))?
        .to_string();

    let mut bodies = Vec::new();
    let mut frames = LinkFrames {
        declared: HashMap::new(),
        source,
    };
    let mut joint_elems = Vec::new();

    for child in elem.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "link" => {
                let link_name = child
                    .attribute("name")
                    .ok_or_else(|| SceneError::model_load(source, "<link> has no name"))?;
                let declared = match child.children().find(|n| n.has_tag_name("pose")) {
                    Some(pose) => (parse_pose(pose, source)?, relative_to(pose)),
                    None => (RigidTransform::identity(), None),
                };
                bodies.push(link_name.to_string());
                frames.declared.insert(link_name.to_string(), declared);
            }
            "joint" => joint_elems.push(child),
            _ => {}
        }
    }

    let joints = joint_elems
        .into_iter()
        .map(|joint| parse_joint(joint, &frames, source))
        .collect::<SceneResult<Vec<_>>>()?;

    let root_body = find_root_body(&bodies, &joints, source)?;
    let root_pose = frames.link_in_model(&root_body)?;

    Ok(ModelDescription {
        name,
        format: ModelFormat::Sdf,
        bodies,
        joints,
        root_body,
        root_pose,
    })
}

fn parse_joint(
    elem: roxmltree::Node,
    frames: &LinkFrames,
    source: &Path,
) -> SceneResult<JointDescription> {
    let name = elem
        .attribute("name")
        .ok_or_else(|| SceneError::model_load(source, "<joint> has no name"))?
        .to_string();

    let kind = match elem.attribute("type").unwrap_or("fixed") {
        "fixed" => JointKind::Fixed,
        "revolute" => JointKind::Revolute,
        "continuous" => JointKind::Continuous,
        "prismatic" => JointKind::Prismatic,
        other => {
            return Err(SceneError::model_load(
                source,
                format!("joint '{}' has unsupported type '{}'", name, other),
            ))
        }
    };

    let child_text = |tag: &str| -> SceneResult<String> {
        elem.children()
            .find(|n| n.has_tag_name(tag))
            .and_then(|n| n.text())
            .map(|t| t.trim().to_string())
            .ok_or_else(|| {
                SceneError::model_load(source, format!("joint '{}' has no <{}>", name, tag))
            })
    };
    let parent = child_text("parent")?;
    let child = child_text("child")?;

    let parent_pose = frames.link_in_model(&parent)?;
    let child_pose = frames.link_in_model(&child)?;

    // Joint pose defaults to the child link frame
    let pivot = match elem.children().find(|n| n.has_tag_name("pose")) {
        Some(pose) => {
            let local = parse_pose(pose, source)?;
            match relative_to(pose) {
                Some(frame) if frame != child => child_pose
                    .inverse()
                    .compose(&frames.in_model(&frame)?)
                    .compose(&local),
                _ => local,
            }
        }
        None => RigidTransform::identity(),
    };

    let mut axis = [1.0, 0.0, 0.0];
    if let Some(axis_elem) = elem.children().find(|n| n.has_tag_name("axis")) {
        if let Some(xyz) = axis_elem.children().find(|n| n.has_tag_name("xyz")) {
            let values = parse_floats(xyz, source)?;
            if values.len() != 3 {
                return Err(SceneError::model_load(
                    source,
                    format!("joint '{}' axis needs 3 values", name),
                ));
            }
            axis = [values[0], values[1], values[2]];

            let expressed_in = match xyz.attribute("expressed_in").filter(|f| !f.is_empty()) {
                Some(frame) => Some(frames.in_model(frame)?),
                None if use_parent_model_frame(axis_elem) => Some(RigidTransform::identity()),
                None => None,
            };
            if let Some(frame) = expressed_in {
                let joint_in_model = child_pose.compose(&pivot);
                let in_model = frame.rotation().transform_vector(&Vector3::from(axis));
                let v = joint_in_model.rotation().inverse_transform_vector(&in_model);
                axis = [v.x, v.y, v.z];
            }
        }
    }

    Ok(JointDescription {
        name,
        kind,
        parent,
        child,
        origin: parent_pose.inverse().compose(&child_pose),
        pivot,
        axis,
    })
}

/// `relative_to` attribute of a `<pose>`; empty means the default frame
fn relative_to(pose: roxmltree::Node) -> Option<String> {
    pose.attribute("relative_to")
        .map(str::trim)
        .filter(|frame| !frame.is_empty())
        .map(str::to_string)
}

fn use_parent_model_frame(axis: roxmltree::Node) -> bool {
    axis.children()
        .find(|n| n.has_tag_name("use_parent_model_frame"))
        .and_then(|n| n.text())
        .map(|t| matches!(t.trim(), "true" | "1"))
        .unwrap_or(false)
}

fn parse_pose(elem: roxmltree::Node, source: &Path) -> SceneResult<RigidTransform> {
    let values = parse_floats(elem, source)?;
    match values.as_slice() {
        [] => Ok(RigidTransform::identity()),
        [x, y, z, roll, pitch, yaw] => Ok(resolve(&[*x, *y, *z, *roll, *pitch, *yaw])),
        _ => Err(SceneError::model_load(
            source,
            format!("<pose> needs 6 values, found {}", values.len()),
        )),
    }
}

fn parse_floats(elem: roxmltree::Node, source: &Path) -> SceneResult<Vec<f64>> {
    elem.text()
        .unwrap_or("")
        .split_whitespace()
        .map(|s| {
            s.parse::<f64>().map_err(|_| {
                SceneError::model_load(
                    source,
                    format!("<{}> has a non-numeric value '{}'", elem.tag_name().name(), s),
                )
            })
        })
        .collect()
}
