//! Application configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const APP_NAME_ENV: &str = "LARDER_APP_NAME";
pub const MODE_ENV: &str = "LARDER_MODE";
pub const STORAGE_DIR_ENV: &str = "LARDER_STORAGE_DIR";

const DEFAULT_APP_NAME: &str = "showcase";
const DEFAULT_STORAGE_DIR: &str = ".larder";

/// Build variant the application runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    Production,
    Test,
}

impl BuildMode {
    /// Development for debug builds, production otherwise.
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            BuildMode::Development
        } else {
            BuildMode::Production
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Production => "production",
            BuildMode::Test => "test",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(BuildMode::Development),
            "production" | "prod" => Ok(BuildMode::Production),
            "test" => Ok(BuildMode::Test),
            _ => Err(ConfigError::InvalidMode {
                value: value.to_string(),
            }),
        }
    }
}

/// Application-level settings shared by the store layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Prefix of the persisted record key.
    pub app_name: String,

    pub mode: BuildMode,

    /// Directory holding persisted records.
    pub storage_dir: PathBuf,
}

impl AppConfig {
    pub fn new(app_name: impl Into<String>) -> Result<Self, ConfigError> {
        let app_name = app_name.into();
        if app_name.trim().is_empty() {
            return Err(ConfigError::EmptyAppName);
        }
        Ok(Self {
            app_name,
            mode: BuildMode::current(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
        })
    }

    /// Load from `LARDER_APP_NAME`, `LARDER_MODE` and `LARDER_STORAGE_DIR`,
    /// falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config =
            Self::new(lookup(APP_NAME_ENV).unwrap_or_else(|| DEFAULT_APP_NAME.to_string()))?;
        if let Some(mode) = lookup(MODE_ENV) {
            config.mode = mode.parse()?;
        }
        if let Some(dir) = lookup(STORAGE_DIR_ENV) {
            config.storage_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = dir.into();
        self
    }

    /// `<app-name>-<build-mode>`.
    pub fn storage_key(&self) -> String {
        format!("{}-{}", self.app_name, self.mode)
    }

    pub fn devtools_enabled(&self) -> bool {
        self.mode == BuildMode::Development
    }
}
