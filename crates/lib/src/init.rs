//! Initialize the configuration directory: create ~/.courier and a template config.
//!
//! The template mirrors `crates/lib/config/config.json`; its placeholders are refused by
//! config validation until replaced with real values.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

static CONFIG_TEMPLATE: &str = include_str!("../config/config.json");

/// Ensure the configuration has been initialized (config file exists).
pub fn require_initialized(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        anyhow::bail!(
            "configuration not initialized; run `courier init` first (config file not found: {})",
            config_path.display()
        );
    }
    Ok(())
}

/// Create the config directory and the template config if it does not exist.
/// An existing config file is never overwritten. Returns the config directory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, CONFIG_TEMPLATE)
            .with_context(|| format!("writing template config to {}", config_path.display()))?;
        log::info!("created template config at {}", config_path.display());
    } else {
        log::debug!("config already exists at {}, skipping", config_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{self, ConfigError};

    #[test]
    fn init_writes_template_that_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        assert!(require_initialized(&path).is_err());

        let created = init_config_dir(&path).unwrap();
        assert_eq!(created, dir.path().join("nested"));
        require_initialized(&path).unwrap();

        let (cfg, _) = config::load_config(Some(path.clone())).unwrap();
        let err = config::resolve_settings_with(&cfg, &path, |_| None).unwrap_err();
        assert_eq!(err, ConfigError::Placeholder(config::API_ID));
    }

    #[test]
    fn init_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{}").unwrap();
        init_config_dir(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
