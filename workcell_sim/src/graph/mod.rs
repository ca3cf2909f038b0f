//! Typed component graph around the plant
//!
//! - [`GraphBuilder`]: add components, connect ports (type and width checked)
//! - [`ComponentGraph`]: the immutable result handed to the runtime
//! - [`station`]: the fixed arm / gripper / camera topology

pub mod builder;
pub mod component;
pub mod port;
pub mod station;

pub use builder::{ComponentGraph, Connection, GraphBuilder, TransportChannel};
pub use component::{ComponentKind, ComponentSpec};
pub use port::{PortDirection, PortRef, PortSpec, PortType};
pub use station::{build_station_graph, ArmStation};
