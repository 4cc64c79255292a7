use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{CONFIG_FILENAME, DEFAULT_TOGGLE_INTERVAL_SECS};
use crate::plugin::PluginLocations;
use crate::policy::EnablementPolicy;
use crate::scheduler::ToggleSchedule;

#[derive(Debug, Deserialize, Default, Clone)]
/// Top-level configuration struct.
pub struct Config {
    #[serde(default)]
    /// The main configuration section.
    pub rulegate: RuleGateConfig,
    /// The path to the configuration file this was loaded from.
    /// Set during loading, `None` if using defaults or programmatic config.
    #[serde(skip)]
    pub config_file_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
/// Configuration options of the `[rulegate]` section.
pub struct RuleGateConfig {
    /// Plugin module locations. Relative paths are resolved against the
    /// directory of the configuration file.
    pub plugin_paths: Option<Vec<PathBuf>>,
    /// Rule families disabled at startup.
    pub disabled_families: Option<Vec<String>>,
    /// Diagnostic ids disabled at startup.
    pub disabled_diagnostics: Option<Vec<String>>,
    /// Periodic toggling, see [`ToggleConfig`].
    pub toggle: Option<ToggleConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
/// Configuration options of the `[rulegate.toggle]` section.
pub struct ToggleConfig {
    /// Flip period in seconds.
    pub interval_secs: Option<u64>,
    /// Rule families to flip.
    pub families: Option<Vec<String>>,
    /// Diagnostic ids to flip.
    pub diagnostics: Option<Vec<String>>,
}

impl RuleGateConfig {
    /// The toggle schedule, if a non-empty `[rulegate.toggle]` section exists.
    #[must_use]
    pub fn toggle_schedule(&self) -> Option<ToggleSchedule> {
        let toggle = self.toggle.as_ref()?;
        let schedule = ToggleSchedule {
            interval: Duration::from_secs(
                toggle
                    .interval_secs
                    .unwrap_or(DEFAULT_TOGGLE_INTERVAL_SECS)
                    .max(1),
            ),
            families: toggle.families.clone().unwrap_or_default(),
            diagnostics: toggle.diagnostics.clone().unwrap_or_default(),
        };
        (!schedule.is_empty()).then_some(schedule)
    }
}

/// Errors from strict configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Configuration file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file is not valid configuration.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Configuration file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },
}

impl Config {
    /// Loads configuration from the current directory upward.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from_path(Path::new("."))
    }

    /// Loads configuration starting from a specific path and traversing up.
    ///
    /// Unreadable or invalid files are logged and skipped; without any usable
    /// file the defaults are returned.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        let mut current = path.to_path_buf();
        if current.is_file() {
            current.pop();
        }

        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                match Self::load_file(&candidate) {
                    Ok(config) => return config,
                    Err(error) => tracing::warn!("ignoring configuration: {error}"),
                }
            }

            if !current.pop() {
                break;
            }
        }

        Config::default()
    }

    /// Loads exactly `path`.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = toml::from_str::<Config>(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.config_file_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Plugin locations with relative entries resolved against the
    /// configuration file's directory.
    #[must_use]
    pub fn plugin_paths(&self) -> Vec<PathBuf> {
        let base = self
            .config_file_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        self.rulegate
            .plugin_paths
            .iter()
            .flatten()
            .map(|path| match &base {
                Some(base) if path.is_relative() => base.join(path),
                _ => path.clone(),
            })
            .collect()
    }

    /// Seeds `policy` and `locations` from this configuration.
    pub fn apply(&self, policy: &EnablementPolicy, locations: &PluginLocations) {
        locations.extend(self.plugin_paths());
        for family in self.rulegate.disabled_families.iter().flatten() {
            policy.disable_family(family.as_str());
        }
        if let Some(ids) = &self.rulegate.disabled_diagnostics {
            policy.disable_ids(ids.iter().map(String::as_str));
        }
    }
}
