use std::path::{Path, PathBuf};

use crate::error::{SceneError, SceneResult};

/// Expand `$VAR`, `${VAR}` and `~` in a resource path.
///
/// Relative results are joined onto `base_dir` (the directory of the scene
/// file) when one is known. `key` names the config entry for error messages.
pub fn expand_path(raw: &str, base_dir: Option<&Path>, key: &str) -> SceneResult<PathBuf> {
    let expanded = shellexpand::full(raw).map_err(|e| {
        SceneError::config(
            key,
            format!("cannot expand '{}': variable {} is not set", raw, e.var_name),
        )
    })?;

    let path = PathBuf::from(expanded.as_ref());
    match base_dir {
        Some(base) if path.is_relative() => Ok(base.join(path)),
        _ => Ok(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("WORKCELL_SIM_TEST_MODELS", "/opt/models");
        let path = expand_path("${WORKCELL_SIM_TEST_MODELS}/brick.urdf", None, "models.brick").unwrap();
        assert_eq!(path, PathBuf::from("/opt/models/brick.urdf"));

        let path = expand_path("$WORKCELL_SIM_TEST_MODELS/table.sdf", None, "models.table").unwrap();
        assert_eq!(path, PathBuf::from("/opt/models/table.sdf"));
    }

    #[test]
    fn test_undefined_variable_names_key() {
        let err = expand_path(
            "${WORKCELL_SIM_DEFINITELY_UNSET_VAR}/x.urdf",
            None,
            "models.widget",
        )
        .unwrap_err();
        match err {
            SceneError::Config { key, reason } => {
                assert_eq!(key, "models.widget");
                assert!(reason.contains("WORKCELL_SIM_DEFINITELY_UNSET_VAR"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_relative_paths_use_base_dir() {
        let path = expand_path("models/brick.urdf", Some(Path::new("/scenes")), "models.brick").unwrap();
        assert_eq!(path, PathBuf::from("/scenes/models/brick.urdf"));

        let path = expand_path("/abs/brick.urdf", Some(Path::new("/scenes")), "models.brick").unwrap();
        assert_eq!(path, PathBuf::from("/abs/brick.urdf"));
    }
}
