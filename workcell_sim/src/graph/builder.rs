//! Component graph assembly
//!
//! [`GraphBuilder`] is the only way to add components and connections; it
//! is consumed by [`GraphBuilder::build`], which hands back an immutable
//! [`ComponentGraph`] that answers port queries.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::info;

use super::component::{ComponentKind, ComponentSpec};
use super::port::{PortDirection, PortRef, PortSpec, PortType};
use crate::error::{SceneError, SceneResult};

/// Directed edge from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub from: PortRef,
    pub to: PortRef,
}

/// Append-only graph under construction
#[derive(Debug, Default)]
pub struct GraphBuilder {
    components: Vec<ComponentSpec>,
    index: HashMap<String, usize>,
    connections: Vec<Connection>,
    driven: HashMap<PortRef, PortRef>,
    exported_outputs: BTreeMap<String, PortRef>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_component(&mut self, spec: ComponentSpec) -> SceneResult<()> {
        if self.index.contains_key(&spec.name) {
            return Err(SceneError::NameCollision {
                kind: "component",
                name: spec.name,
            });
        }
        self.index.insert(spec.name.clone(), self.components.len());
        self.components.push(spec);
        Ok(())
    }

    fn port(&self, port: &PortRef, direction: PortDirection) -> SceneResult<&PortSpec> {
        self.index
            .get(&port.component)
            .and_then(|&i| self.components[i].port(direction, &port.port))
            .ok_or_else(|| SceneError::UnknownPort {
                port: port.to_string(),
            })
    }

    /// Connect an output port to an input port.
    ///
    /// Types and widths must match exactly; each input may be driven once.
    pub fn connect(&mut self, from: PortRef, to: PortRef) -> SceneResult<()> {
        let from_type = &self.port(&from, PortDirection::Output)?.port_type;
        let to_type = &self.port(&to, PortDirection::Input)?.port_type;

        match (from_type, to_type) {
            (PortType::Vector { width: a }, PortType::Vector { width: b }) => {
                if a != b {
                    return Err(SceneError::PortArity {
                        from: from.to_string(),
                        from_width: *a,
                        to: to.to_string(),
                        to_width: *b,
                    });
                }
            }
            (a, b) if a != b => {
                return Err(SceneError::PortType {
                    from: from.to_string(),
                    from_type: a.to_string(),
                    to: to.to_string(),
                    to_type: b.to_string(),
                });
            }
            _ => {}
        }

        if let Some(existing) = self.driven.get(&to) {
            return Err(SceneError::PortAlreadyConnected {
                port: to.to_string(),
                source_port: existing.to_string(),
            });
        }

        self.driven.insert(to.clone(), from.clone());
        self.connections.push(Connection { from, to });
        Ok(())
    }

    /// Expose an output port to the runtime under `name`
    pub fn export_output(&mut self, port: PortRef, name: impl Into<String>) -> SceneResult<()> {
        let name = name.into();
        self.port(&port, PortDirection::Output)?;
        if self.exported_outputs.contains_key(&name) {
            return Err(SceneError::NameCollision {
                kind: "exported port",
                name,
            });
        }
        self.exported_outputs.insert(name, port);
        Ok(())
    }

    pub fn build(self) -> ComponentGraph {
        info!(
            "Component graph built: {} components, {} connections, {} exported outputs",
            self.components.len(),
            self.connections.len(),
            self.exported_outputs.len()
        );
        ComponentGraph {
            components: self.components,
            connections: self.connections,
            exported_outputs: self.exported_outputs,
        }
    }
}

/// Transport channel used by a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportChannel {
    pub channel: String,
    pub direction: PortDirection,
    pub component: String,
}

/// A finalized, immutable component graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentGraph {
    components: Vec<ComponentSpec>,
    connections: Vec<Connection>,
    exported_outputs: BTreeMap<String, PortRef>,
}

impl ComponentGraph {
    pub fn components(&self) -> &[ComponentSpec] {
        &self.components
    }

    pub fn component(&self, name: &str) -> Option<&ComponentSpec> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn input_port(&self, component: &str, port: &str) -> SceneResult<&PortSpec> {
        self.find_port(component, port, PortDirection::Input)
    }

    pub fn output_port(&self, component: &str, port: &str) -> SceneResult<&PortSpec> {
        self.find_port(component, port, PortDirection::Output)
    }

    fn find_port(&self, component: &str, port: &str, direction: PortDirection) -> SceneResult<&PortSpec> {
        self.component(component)
            .and_then(|c| c.port(direction, port))
            .ok_or_else(|| SceneError::UnknownPort {
                port: PortRef::new(component, port).to_string(),
            })
    }

    /// Output port exported to the runtime under `name`
    pub fn exported_output(&self, name: &str) -> SceneResult<&PortRef> {
        self.exported_outputs
            .get(name)
            .ok_or_else(|| SceneError::UnknownPort {
                port: name.to_string(),
            })
    }

    pub fn exported_outputs(&self) -> &BTreeMap<String, PortRef> {
        &self.exported_outputs
    }

    /// Output port driving `input`, if connected
    pub fn source_of(&self, input: &PortRef) -> Option<&PortRef> {
        self.connections
            .iter()
            .find(|c| &c.to == input)
            .map(|c| &c.from)
    }

    /// First component of the given kind
    pub fn find_component<F>(&self, predicate: F) -> Option<&ComponentSpec>
    where
        F: Fn(&ComponentKind) -> bool,
    {
        self.components.iter().find(|c| predicate(&c.kind))
    }

    /// Every external transport channel, in component order
    pub fn transport_channels(&self) -> Vec<TransportChannel> {
        let mut channels = Vec::new();
        for component in &self.components {
            let mut push = |channel: &str, direction| {
                channels.push(TransportChannel {
                    channel: channel.to_string(),
                    direction,
                    component: component.name.clone(),
                })
            };
            match &component.kind {
                ComponentKind::TransportSubscriber { channel } => {
                    push(channel.as_str(), PortDirection::Input)
                }
                ComponentKind::TransportPublisher { channel, .. } => {
                    push(channel.as_str(), PortDirection::Output)
                }
                ComponentKind::GripperBridge {
                    action_channel,
                    status_channel,
                } => {
                    push(action_channel.as_str(), PortDirection::Input);
                    push(status_channel.as_str(), PortDirection::Output);
                }
                _ => {}
            }
        }
        channels
    }
}
