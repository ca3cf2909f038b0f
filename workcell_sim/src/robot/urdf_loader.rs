use std::path::Path;

use urdf_rs::{JointType, Robot as UrdfRobot};

use super::description::{
    find_root_body, JointDescription, JointKind, ModelDescription, ModelFormat, ModelParser,
};
use crate::error::{SceneError, SceneResult};
use crate::tf::RigidTransform;

/// URDF models: the root link is the canonical model frame
#[derive(Debug, Default, Clone, Copy)]
pub struct UrdfParser;

impl ModelParser for UrdfParser {
    fn format(&self) -> ModelFormat {
        ModelFormat::Urdf
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["urdf"]
    }

    fn parse(&self, text: &str, source: &Path) -> SceneResult<ModelDescription> {
        let urdf = urdf_rs::read_from_string(text)
            .map_err(|e| SceneError::model_load(source, format!("invalid URDF: {}", e)))?;
        description_from_urdf(&urdf, source)
    }
}

pub fn description_from_urdf(urdf: &UrdfRobot, source: &Path) -> SceneResult<ModelDescription> {
    let bodies: Vec<String> = urdf.links.iter().map(|l| l.name.clone()).collect();

    let joints = urdf
        .joints
        .iter()
        .map(|joint| {
            let kind = match joint.joint_type {
                JointType::Fixed => JointKind::Fixed,
                JointType::Revolute => JointKind::Revolute,
                JointType::Continuous => JointKind::Continuous,
                JointType::Prismatic => JointKind::Prismatic,
                ref other => {
                    return Err(SceneError::model_load(
                        source,
                        format!("joint '{}' has unsupported type {:?}", joint.name, other),
                    ))
                }
            };

            let xyz = &joint.origin.xyz;
            let rpy = &joint.origin.rpy;
            let axis = &joint.axis.xyz;
            Ok(JointDescription {
                name: joint.name.clone(),
                kind,
                parent: joint.parent.link.clone(),
                child: joint.child.link.clone(),
                origin: RigidTransform::from_rpy([rpy[0], rpy[1], rpy[2]], [xyz[0], xyz[1], xyz[2]]),
                pivot: RigidTransform::identity(),
                axis: [axis[0], axis[1], axis[2]],
            })
        })
        .collect::<SceneResult<Vec<_>>>()?;

    let root_body = find_root_body(&bodies, &joints, source)?;

    Ok(ModelDescription {
        name: urdf.name.clone(),
        format: ModelFormat::Urdf,
        bodies,
        joints,
        root_body,
        root_pose: RigidTransform::identity(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TWO_LINK: &str = r#"<?xml version="1.0"?>
<robot name="two_link">
  <link name="base"/>
  <link name="arm"/>
  <joint name="shoulder" type="revolute">
    <parent link="base"/>
    <child link="arm"/>
    <origin xyz="0 0 0.3" rpy="0 0 0"/>
    <axis xyz="0 1 0"/>
    <limit lower="-1.5" upper="1.5" effort="10" velocity="1"/>
  </joint>
</robot>
"#;

    #[test]
    fn test_parse_two_link() {
        let description = UrdfParser.parse(TWO_LINK, Path::new("two_link.urdf")).unwrap();
        assert_eq!(description.name, "two_link");
        assert_eq!(description.root_body, "base");
        assert_eq!(description.bodies, vec!["base".to_string(), "arm".to_string()]);
        assert_eq!(description.num_positions(), 1);

        let shoulder = &description.joints[0];
        assert_eq!(shoulder.kind, JointKind::Revolute);
        assert_eq!(shoulder.axis, [0.0, 1.0, 0.0]);
        assert_relative_eq!(shoulder.origin.translation()[2], 0.3);
        assert_eq!(description.root_pose, RigidTransform::identity());
    }

    #[test]
    fn test_invalid_xml_is_model_load_error() {
        let err = UrdfParser
            .parse("<robot name=", Path::new("broken.urdf"))
            .unwrap_err();
        match err {
            SceneError::ModelLoad { path, .. } => assert_eq!(path, Path::new("broken.urdf")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_unsupported_joint_type() {
        let text = r#"<robot name="floaty">
  <link name="a"/>
  <link name="b"/>
  <joint name="free" type="floating">
    <parent link="a"/>
    <child link="b"/>
  </joint>
</robot>"#;
        let err = UrdfParser.parse(text, Path::new("floaty.urdf")).unwrap_err();
        assert!(err.to_string().contains("free"));
    }
}
