//! Model definitions and loaders
//!
//! - [`ModelRegistry`]: class name -> resource, instantiation into a plant
//! - [`UrdfParser`] / [`SdfParser`]: the supported description formats
//! - [`ModelDescription`]: what both formats are reduced to

pub mod description;
pub mod registry;
pub mod sdf_loader;
pub mod urdf_loader;

pub use description::{JointDescription, JointKind, ModelDescription, ModelFormat, ModelParser};
pub use registry::ModelRegistry;
pub use sdf_loader::SdfParser;
pub use urdf_loader::UrdfParser;
