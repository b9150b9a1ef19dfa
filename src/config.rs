//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/hass-prune/hass-prune.toml`
//! 3. Environment variables: `HASS_PRUNE_*` prefix
//! 4. Command line flags (applied by the CLI layer)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Unified configuration for hass-prune.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Home Assistant `.storage` directory holding the registries
    pub storage_dir: PathBuf,
    /// Copy each registry file aside before overwriting it
    pub backup: bool,
    /// JSON indentation width used when writing registries
    pub indent: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".storage"),
            backup: true,
            indent: 4,
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub storage_dir: Option<PathBuf>,
    pub backup: Option<bool>,
    pub indent: Option<usize>,
}

/// Get the XDG config directory for hass-prune.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "hass-prune").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("hass-prune.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

/// Load a TOML file into RawSettings.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay values win if specified, otherwise keep self.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            storage_dir: overlay
                .storage_dir
                .clone()
                .unwrap_or_else(|| self.storage_dir.clone()),
            backup: overlay.backup.unwrap_or(self.backup),
            indent: overlay.indent.unwrap_or(self.indent),
        }
    }

    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.storage_dir.to_string_lossy().as_ref());
        self.storage_dir = PathBuf::from(expanded);
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Explicit config file, replacing the global one
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        let file = config_file
            .map(Path::to_path_buf)
            .or_else(|| global_config_path().filter(|p| p.exists()));
        if let Some(path) = file {
            tracing::debug!("loading config from {}", path.display());
            let raw = load_raw_settings(&path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply HASS_PRUNE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("HASS_PRUNE").try_parsing(true))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("storage_dir") {
            settings.storage_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("backup") {
            settings.backup = val;
        }
        if let Ok(val) = config.get_int("indent") {
            settings.indent = usize::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("indent must not be negative: {}", val),
            })?;
        }

        Ok(settings)
    }

    /// Render settings as TOML (for `config show`).
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize settings: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_unspecified_values() {
        let base = Settings::default();
        let overlay = RawSettings {
            storage_dir: Some(PathBuf::from("/config/.storage")),
            backup: None,
            indent: None,
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.storage_dir, PathBuf::from("/config/.storage"));
        assert!(merged.backup);
        assert_eq!(merged.indent, 4);
    }
}
