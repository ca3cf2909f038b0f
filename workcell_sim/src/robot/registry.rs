//! Model registry
//!
//! Maps model class names to resource files and turns them into plant
//! instances through the parser that claims the file extension.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::description::{ModelDescription, ModelParser};
use super::sdf_loader::SdfParser;
use super::urdf_loader::UrdfParser;
use crate::config::{expand_path, SceneConfig};
use crate::error::{SceneError, SceneResult};
use crate::plant::{InstanceId, MultibodyPlant};

pub struct ModelRegistry {
    definitions: BTreeMap<String, PathBuf>,
    parsers: Vec<Box<dyn ModelParser>>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// Registry with the URDF and SDF parsers and no model classes
    pub fn new() -> Self {
        Self {
            definitions: BTreeMap::new(),
            parsers: vec![Box::new(UrdfParser), Box::new(SdfParser)],
        }
    }

    /// Register every `models` entry, expanding variables in the paths
    pub fn from_config(config: &SceneConfig) -> SceneResult<Self> {
        let mut registry = Self::new();
        for (class, raw) in &config.models {
            let path = expand_path(raw, config.base_dir.as_deref(), &format!("models.{}", class))?;
            registry.register(class.clone(), path);
        }
        Ok(registry)
    }

    pub fn register(&mut self, class: impl Into<String>, path: impl Into<PathBuf>) {
        self.definitions.insert(class.into(), path.into());
    }

    pub fn contains(&self, class: &str) -> bool {
        self.definitions.contains_key(class)
    }

    pub fn path(&self, class: &str) -> SceneResult<&Path> {
        self.definitions
            .get(class)
            .map(PathBuf::as_path)
            .ok_or_else(|| {
                SceneError::config(
                    format!("models.{}", class),
                    format!("model class '{}' is not defined", class),
                )
            })
    }

    /// Read and parse the resource behind `class`
    pub fn load(&self, class: &str) -> SceneResult<ModelDescription> {
        let path = self.path(class)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let parser = self
            .parsers
            .iter()
            .find(|p| p.extensions().iter().any(|e| *e == extension))
            .ok_or_else(|| {
                SceneError::model_load(path, format!("unsupported model format '.{}'", extension))
            })?;

        let text = std::fs::read_to_string(path)
            .map_err(|e| SceneError::model_load(path, e.to_string()))?;
        debug!("Parsing {} as {}", path.display(), parser.format());
        parser.parse(&text, path)
    }

    /// Load `class` and add it to the plant as `instance_name`
    pub fn instantiate(
        &self,
        plant: &mut MultibodyPlant,
        class: &str,
        instance_name: &str,
    ) -> SceneResult<InstanceId> {
        plant.ensure_building("add_model_instance")?;
        if plant.instance_by_name(instance_name).is_some() {
            return Err(SceneError::NameCollision {
                kind: "instance",
                name: instance_name.to_string(),
            });
        }

        let description = self.load(class)?;
        let path = self.path(class)?;
        let id = plant.add_model_instance(instance_name, class, path, &description)?;

        info!(
            "Loaded instance '{}' of '{}' ({}, {} bodies)",
            instance_name,
            class,
            description.format,
            description.bodies.len()
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const BRICK: &str = r#"<robot name="brick"><link name="base_link"/></robot>"#;

    fn write_model(dir: &Path, file: &str, text: &str) -> PathBuf {
        let path = dir.join(file);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(text.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_instantiate_twice_without_aliasing() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ModelRegistry::new();
        registry.register("brick", write_model(dir.path(), "brick.urdf", BRICK));

        let mut plant = MultibodyPlant::new();
        let a = registry.instantiate(&mut plant, "brick", "brick_0").unwrap();
        let b = registry.instantiate(&mut plant, "brick", "brick_1").unwrap();
        assert_ne!(a, b);
        assert_eq!(plant.num_instances(), 2);
        assert!(plant.resolve_frame("brick_1::base_link").is_ok());

        let err = registry.instantiate(&mut plant, "brick", "brick_0").unwrap_err();
        assert!(matches!(err, SceneError::NameCollision { .. }));
    }

    #[test]
    fn test_unknown_class_is_config_error() {
        let registry = ModelRegistry::new();
        let mut plant = MultibodyPlant::new();
        let err = registry.instantiate(&mut plant, "sphere", "sphere_0").unwrap_err();
        match err {
            SceneError::Config { key, .. } => assert_eq!(key, "models.sphere"),
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(plant.num_instances(), 0);
    }

    #[test]
    fn test_missing_file_is_model_load_error() {
        let mut registry = ModelRegistry::new();
        registry.register("ghost", "/nonexistent/ghost.urdf");
        let mut plant = MultibodyPlant::new();
        let err = registry.instantiate(&mut plant, "ghost", "ghost_0").unwrap_err();
        assert!(matches!(err, SceneError::ModelLoad { .. }));
        assert!(err.to_string().contains("ghost.urdf"));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ModelRegistry::new();
        registry.register("mesh", write_model(dir.path(), "mesh.obj", "v 0 0 0"));
        let err = registry.load("mesh").unwrap_err();
        assert!(err.to_string().contains(".obj"));
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ModelRegistry::new();
        registry.register("brick", write_model(dir.path(), "BRICK.URDF", BRICK));
        assert_eq!(registry.load("brick").unwrap().root_body, "base_link");
    }
}
