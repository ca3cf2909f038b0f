//! Component catalogue
//!
//! Each constructor returns the port signature of one kind of runtime
//! component. The runtime supplies the behavior; the graph only needs
//! names, types and widths.

use serde::Serialize;

use super::port::{PortDirection, PortSpec, PortType};
use crate::error::{SceneError, SceneResult};
use crate::sensors::CameraProperties;
use crate::tf::Pose6;

pub const QUERY_OBJECT: &str = "QueryObject";
pub const ARM_COMMAND_MESSAGE: &str = "ArmCommandMessage";
pub const ARM_STATUS_MESSAGE: &str = "ArmStatusMessage";
pub const COLOR_IMAGE: &str = "ImageRgba8U";
pub const DEPTH_IMAGE: &str = "ImageDepth32F";
pub const LABEL_IMAGE: &str = "ImageLabel16I";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKind {
    Plant {
        arm_dof: Option<usize>,
    },
    TransportSubscriber {
        channel: String,
    },
    TransportPublisher {
        channel: String,
        publish_period: f64,
    },
    CommandReceiver {
        num_joints: usize,
    },
    Demultiplexer {
        input_width: usize,
        output_width: usize,
    },
    ZeroPaddingGain {
        input_width: usize,
        output_width: usize,
    },
    StatusSender {
        num_joints: usize,
    },
    GripperBridge {
        action_channel: String,
        status_channel: String,
    },
    RgbdCamera {
        channel: String,
        frame: String,
        mount: Pose6,
        properties: CameraProperties,
    },
}

/// A component's name, kind and port signature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSpec {
    pub name: String,
    pub kind: ComponentKind,
    pub inputs: Vec<PortSpec>,
    pub outputs: Vec<PortSpec>,
}

impl ComponentSpec {
    fn new(
        name: impl Into<String>,
        kind: ComponentKind,
        inputs: Vec<PortSpec>,
        outputs: Vec<PortSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            inputs,
            outputs,
        }
    }

    pub fn port(&self, direction: PortDirection, name: &str) -> Option<&PortSpec> {
        let ports = match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        };
        ports.iter().find(|p| p.name == name)
    }

    /// The simulated plant. With an arm of `arm_dof` joints it exposes the
    /// station ports; without one only the geometry query output.
    pub fn plant(name: impl Into<String>, arm_dof: Option<usize>) -> Self {
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();

        if let Some(n) = arm_dof {
            inputs.extend([
                PortSpec::vector("arm_position", n),
                PortSpec::vector("arm_feedforward_torque", n),
                PortSpec::vector("gripper_position", 1),
                PortSpec::vector("gripper_force_limit", 1),
            ]);
            outputs.extend([
                PortSpec::vector("arm_position_commanded", n),
                PortSpec::vector("arm_state_estimated", 2 * n),
                PortSpec::vector("arm_torque_commanded", n),
                PortSpec::vector("arm_torque_measured", n),
                PortSpec::vector("arm_torque_external", n),
                PortSpec::vector("gripper_state_measured", 2),
                PortSpec::vector("gripper_force_measured", 1),
            ]);
        }
        outputs.push(PortSpec::abstract_value("query_object", QUERY_OBJECT));

        Self::new(name, ComponentKind::Plant { arm_dof }, inputs, outputs)
    }

    pub fn transport_subscriber(
        name: impl Into<String>,
        channel: impl Into<String>,
        message: &str,
    ) -> Self {
        Self::new(
            name,
            ComponentKind::TransportSubscriber {
                channel: channel.into(),
            },
            vec![],
            vec![PortSpec::abstract_value("message", message)],
        )
    }

    pub fn transport_publisher(
        name: impl Into<String>,
        channel: impl Into<String>,
        message: &str,
        publish_period: f64,
    ) -> Self {
        Self::new(
            name,
            ComponentKind::TransportPublisher {
                channel: channel.into(),
                publish_period,
            },
            vec![PortSpec::abstract_value("message", message)],
            vec![],
        )
    }

    /// Decodes arm commands into a `2n` state (position, velocity) and an
    /// `n` commanded torque.
    pub fn command_receiver(name: impl Into<String>, num_joints: usize) -> Self {
        Self::new(
            name,
            ComponentKind::CommandReceiver { num_joints },
            vec![PortSpec::abstract_value("command_message", ARM_COMMAND_MESSAGE)],
            vec![
                PortSpec::vector("state", 2 * num_joints),
                PortSpec::vector("commanded_torque", num_joints),
            ],
        )
    }

    /// Splits one vector into `input_width / output_width` equal outputs
    /// named `output_0`, `output_1`, ...
    pub fn demultiplexer(
        name: impl Into<String>,
        input_width: usize,
        output_width: usize,
    ) -> SceneResult<Self> {
        let name = name.into();
        if output_width == 0 || input_width % output_width != 0 {
            return Err(SceneError::PortArity {
                from: format!("{}.input", name),
                from_width: input_width,
                to: format!("{}.output_0", name),
                to_width: output_width,
            });
        }

        let outputs = (0..input_width / output_width)
            .map(|i| PortSpec::vector(format!("output_{}", i), output_width))
            .collect();
        Ok(Self::new(
            name,
            ComponentKind::Demultiplexer {
                input_width,
                output_width,
            },
            vec![PortSpec::vector("input", input_width)],
            outputs,
        ))
    }

    /// `y = [I; 0] u`: copies the input and pads with zeros
    pub fn zero_padding_gain(
        name: impl Into<String>,
        input_width: usize,
        output_width: usize,
    ) -> SceneResult<Self> {
        let name = name.into();
        if output_width < input_width {
            return Err(SceneError::PortArity {
                from: format!("{}.u", name),
                from_width: input_width,
                to: format!("{}.y", name),
                to_width: output_width,
            });
        }
        Ok(Self::new(
            name,
            ComponentKind::ZeroPaddingGain {
                input_width,
                output_width,
            },
            vec![PortSpec::vector("u", input_width)],
            vec![PortSpec::vector("y", output_width)],
        ))
    }

    pub fn status_sender(name: impl Into<String>, num_joints: usize) -> Self {
        Self::new(
            name,
            ComponentKind::StatusSender { num_joints },
            vec![
                PortSpec::vector("command", 2 * num_joints),
                PortSpec::vector("state", 2 * num_joints),
                PortSpec::vector("commanded_torque", num_joints),
                PortSpec::vector("measured_torque", num_joints),
                PortSpec::vector("external_torque", num_joints),
            ],
            vec![PortSpec::abstract_value("status_message", ARM_STATUS_MESSAGE)],
        )
    }

    /// Gripper driver bridge: action requests in, status out, both on the
    /// external transport.
    pub fn gripper_bridge(
        name: impl Into<String>,
        action_channel: impl Into<String>,
        status_channel: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            ComponentKind::GripperBridge {
                action_channel: action_channel.into(),
                status_channel: status_channel.into(),
            },
            vec![
                PortSpec::vector("state_measured", 2),
                PortSpec::vector("force_measured", 1),
            ],
            vec![
                PortSpec::vector("position_command", 1),
                PortSpec::vector("force_limit", 1),
            ],
        )
    }

    pub fn rgbd_camera(
        name: impl Into<String>,
        channel: impl Into<String>,
        frame: impl Into<String>,
        mount: Pose6,
        properties: CameraProperties,
    ) -> Self {
        Self::new(
            name,
            ComponentKind::RgbdCamera {
                channel: channel.into(),
                frame: frame.into(),
                mount,
                properties,
            },
            vec![PortSpec::abstract_value("query_object", QUERY_OBJECT)],
            vec![
                PortSpec::abstract_value("color_image", COLOR_IMAGE),
                PortSpec::abstract_value("depth_image", DEPTH_IMAGE),
                PortSpec::abstract_value("label_image", LABEL_IMAGE),
            ],
        )
    }

    pub fn port_type(&self, direction: PortDirection, name: &str) -> Option<&PortType> {
        self.port(direction, name).map(|p| &p.port_type)
    }
}
