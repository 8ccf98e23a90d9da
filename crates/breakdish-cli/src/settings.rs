// Config file resolution.
//
// Order: an explicit --config path, then breakdish.toml in the platform
// config directory, then the built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use breakdish_core::config::{load_config_from, EngineConfig};
use directories::ProjectDirs;
use tracing::{debug, info};

pub const CONFIG_FILE: &str = "breakdish.toml";

/// `<platform config dir>/breakdish.toml`, when the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "breakdish").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

pub fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<EngineConfig> {
    if let Some(path) = explicit {
        let config = load_config_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        info!("config loaded from {}", path.display());
        return Ok(config);
    }
    resolve_from(default_config_path().as_deref())
}

/// Load `candidate` if it exists, otherwise fall back to defaults.
pub fn resolve_from(candidate: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match candidate {
        Some(path) if path.exists() => {
            let config = load_config_from(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            info!("config loaded from {}", path.display());
            Ok(config)
        }
        _ => {
            debug!("no config file found, using built-in defaults");
            Ok(EngineConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_candidate_gives_defaults() {
        let path = std::env::temp_dir().join("breakdish_settings_absent.toml");
        let _ = std::fs::remove_file(&path);
        assert_eq!(resolve_from(Some(&path)).unwrap(), EngineConfig::default());
        assert_eq!(resolve_from(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let path = std::env::temp_dir().join("breakdish_settings_missing_explicit.toml");
        let _ = std::fs::remove_file(&path);
        assert!(resolve_config(Some(&path)).is_err());
    }

    #[test]
    fn candidate_file_is_loaded() {
        let path = std::env::temp_dir().join("breakdish_settings_present.toml");
        std::fs::write(&path, "[simulation]\niterations = 250\n").unwrap();
        let config = resolve_from(Some(&path)).unwrap();
        assert_eq!(config.simulation.iterations, 250);
        let _ = std::fs::remove_file(&path);
    }
}
