//! Work-cell station topology
//!
//! ```text
//! command subscriber -> command receiver -state-> demux -output_0-> plant.arm_position
//!                                        -commanded_torque-> plant.arm_feedforward_torque
//! plant.arm_position_commanded -> padding gain -> status sender.command
//! plant.arm_state_estimated / torques -> status sender -> status publisher
//! gripper bridge <-> plant gripper ports
//! plant.query_object -> every camera
//! ```

use super::builder::{ComponentGraph, GraphBuilder};
use super::component::{ComponentSpec, ARM_COMMAND_MESSAGE, ARM_STATUS_MESSAGE};
use super::port::PortRef;
use crate::config::ChannelConfig;
use crate::error::SceneResult;
use crate::sensors::SensorMount;
use crate::tf::to_pose6;

pub const PLANT: &str = "plant";
pub const COMMAND_SUBSCRIBER: &str = "arm_command_subscriber";
pub const COMMAND_RECEIVER: &str = "arm_command_receiver";
pub const COMMAND_DEMUX: &str = "arm_command_demux";
pub const STATUS_PADDING: &str = "arm_status_padding";
pub const STATUS_SENDER: &str = "arm_status_sender";
pub const STATUS_PUBLISHER: &str = "arm_status_publisher";
pub const GRIPPER_BRIDGE: &str = "gripper_bridge";

/// Arm control wiring parameters
#[derive(Debug, Clone, Copy)]
pub struct ArmStation<'a> {
    pub dof: usize,
    pub channels: &'a ChannelConfig,
}

fn port(component: &str, port: &str) -> PortRef {
    PortRef::new(component, port)
}

/// Build the station graph: plant, optional arm/gripper control loop, and
/// one camera per mount.
pub fn build_station_graph(
    arm: Option<ArmStation>,
    mounts: &[SensorMount],
) -> SceneResult<ComponentGraph> {
    let mut builder = GraphBuilder::new();
    builder.add_component(ComponentSpec::plant(PLANT, arm.map(|a| a.dof)))?;

    if let Some(arm) = arm {
        wire_arm(&mut builder, arm)?;
    }

    for mount in mounts {
        builder.add_component(ComponentSpec::rgbd_camera(
            mount.name.clone(),
            mount.channel.clone(),
            mount.frame.name.clone(),
            to_pose6(&mount.body_to_camera),
            mount.properties,
        ))?;
        builder.connect(
            port(PLANT, "query_object"),
            port(&mount.name, "query_object"),
        )?;

        let [rgb, depth, label] = mount.exported_ports();
        builder.export_output(port(&mount.name, "color_image"), rgb)?;
        builder.export_output(port(&mount.name, "depth_image"), depth)?;
        builder.export_output(port(&mount.name, "label_image"), label)?;
    }

    Ok(builder.build())
}

fn wire_arm(builder: &mut GraphBuilder, arm: ArmStation) -> SceneResult<()> {
    let n = arm.dof;
    let channels = arm.channels;

    // Command path
    builder.add_component(ComponentSpec::transport_subscriber(
        COMMAND_SUBSCRIBER,
        channels.command.clone(),
        ARM_COMMAND_MESSAGE,
    ))?;
    builder.add_component(ComponentSpec::command_receiver(COMMAND_RECEIVER, n))?;
    builder.add_component(ComponentSpec::demultiplexer(COMMAND_DEMUX, 2 * n, n)?)?;

    builder.connect(
        port(COMMAND_SUBSCRIBER, "message"),
        port(COMMAND_RECEIVER, "command_message"),
    )?;
    builder.connect(port(COMMAND_RECEIVER, "state"), port(COMMAND_DEMUX, "input"))?;
    builder.connect(port(COMMAND_DEMUX, "output_0"), port(PLANT, "arm_position"))?;
    builder.connect(
        port(COMMAND_RECEIVER, "commanded_torque"),
        port(PLANT, "arm_feedforward_torque"),
    )?;

    // Status path
    builder.add_component(ComponentSpec::zero_padding_gain(STATUS_PADDING, n, 2 * n)?)?;
    builder.add_component(ComponentSpec::status_sender(STATUS_SENDER, n))?;
    builder.add_component(ComponentSpec::transport_publisher(
        STATUS_PUBLISHER,
        channels.status.clone(),
        ARM_STATUS_MESSAGE,
        channels.status_period,
    ))?;

    builder.connect(port(PLANT, "arm_position_commanded"), port(STATUS_PADDING, "u"))?;
    builder.connect(port(STATUS_PADDING, "y"), port(STATUS_SENDER, "command"))?;
    builder.connect(port(PLANT, "arm_state_estimated"), port(STATUS_SENDER, "state"))?;
    builder.connect(
        port(PLANT, "arm_torque_commanded"),
        port(STATUS_SENDER, "commanded_torque"),
    )?;
    builder.connect(
        port(PLANT, "arm_torque_measured"),
        port(STATUS_SENDER, "measured_torque"),
    )?;
    builder.connect(
        port(PLANT, "arm_torque_external"),
        port(STATUS_SENDER, "external_torque"),
    )?;
    builder.connect(
        port(STATUS_SENDER, "status_message"),
        port(STATUS_PUBLISHER, "message"),
    )?;

    // Gripper
    builder.add_component(ComponentSpec::gripper_bridge(
        GRIPPER_BRIDGE,
        channels.gripper_action.clone(),
        channels.gripper_status.clone(),
    ))?;
    builder.connect(
        port(GRIPPER_BRIDGE, "position_command"),
        port(PLANT, "gripper_position"),
    )?;
    builder.connect(
        port(GRIPPER_BRIDGE, "force_limit"),
        port(PLANT, "gripper_force_limit"),
    )?;
    builder.connect(
        port(PLANT, "gripper_state_measured"),
        port(GRIPPER_BRIDGE, "state_measured"),
    )?;
    builder.connect(
        port(PLANT, "gripper_force_measured"),
        port(GRIPPER_BRIDGE, "force_measured"),
    )?;

    Ok(())
}
