//! Typed ports

use std::fmt;

use serde::Serialize;

/// Value carried by a port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PortType {
    /// Fixed-width vector of reals
    Vector { width: usize },
    /// Opaque value identified by a type name (messages, images, queries)
    Abstract { value: String },
}

impl PortType {
    pub fn vector(width: usize) -> Self {
        PortType::Vector { width }
    }

    pub fn abstract_value(value: impl Into<String>) -> Self {
        PortType::Abstract {
            value: value.into(),
        }
    }

    pub fn width(&self) -> Option<usize> {
        match self {
            PortType::Vector { width } => Some(*width),
            PortType::Abstract { .. } => None,
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortType::Vector { width } => write!(f, "vector[{}]", width),
            PortType::Abstract { value } => write!(f, "abstract<{}>", value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

/// A named port declared by a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub port_type: PortType,
}

impl PortSpec {
    pub fn vector(name: impl Into<String>, width: usize) -> Self {
        Self {
            name: name.into(),
            port_type: PortType::vector(width),
        }
    }

    pub fn abstract_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port_type: PortType::abstract_value(value),
        }
    }
}

/// `component.port`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PortRef {
    pub component: String,
    pub port: String,
}

impl PortRef {
    pub fn new(component: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.port)
    }
}
