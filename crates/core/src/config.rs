//! Config file parsing for `~/.config/douban-meta/config.toml`.
//!
//! Use `DoubanConfig::from(&cfg.douban)` to build provider configuration from
//! the loaded file.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lookup::douban::{CoverFailure, DEFAULT_BASE_URL, DEFAULT_MAX_COUNT};

/// Environment variable that overrides `douban.apikey`.
pub const APIKEY_ENV: &str = "DOUBAN_APIKEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub douban: DoubanSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoubanSettings {
    #[serde(default)]
    pub apikey: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_true")]
    pub copy_image: bool,
    #[serde(default)]
    pub manual_select: bool,
    #[serde(default = "default_max_count")]
    pub max_count: u32,
    #[serde(default)]
    pub cover_failure: CoverFailure,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_count() -> u32 {
    DEFAULT_MAX_COUNT
}

impl Default for DoubanSettings {
    fn default() -> Self {
        Self {
            apikey: String::new(),
            base_url: default_base_url(),
            copy_image: true,
            manual_select: false,
            max_count: DEFAULT_MAX_COUNT,
            cover_failure: CoverFailure::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply environment overrides (`DOUBAN_APIKEY`).
    pub fn with_env(mut self) -> Self {
        if let Ok(key) = std::env::var(APIKEY_ENV) {
            if !key.trim().is_empty() {
                self.douban.apikey = key.trim().to_string();
            }
        }
        self
    }

    /// Set a value by dot-separated key, e.g. `douban.max_count`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let parts: Vec<&str> = key.split('.').collect();
        match parts.as_slice() {
            ["douban", sub] => match *sub {
                "apikey" => self.douban.apikey = value.to_string(),
                "base_url" => self.douban.base_url = value.to_string(),
                "copy_image" => self.douban.copy_image = value.parse().map_err(|_| invalid())?,
                "manual_select" => self.douban.manual_select = value.parse().map_err(|_| invalid())?,
                "max_count" => self.douban.max_count = value.parse().map_err(|_| invalid())?,
                "cover_failure" => {
                    self.douban.cover_failure = match value {
                        "abort" => CoverFailure::Abort,
                        "skip" => CoverFailure::Skip,
                        _ => return Err(invalid()),
                    }
                }
                _ => return Err(ConfigError::UnknownKey(key.to_string())),
            },
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

/// Load config from the default path. A missing or broken file yields
/// defaults; environment overrides are applied either way.
pub fn load_config() -> AppConfig {
    let cfg = match config_path() {
        Some(path) => load_config_from(&path).unwrap_or_else(|e| {
            tracing::warn!("{}, using defaults", e);
            AppConfig::default()
        }),
        None => AppConfig::default(),
    };
    cfg.with_env()
}

/// Read a config file. A missing file is not an error.
pub fn load_config_from(path: &std::path::Path) -> Result<AppConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(e) => return Err(e.into()),
    };
    AppConfig::from_toml(&content, &path.display().to_string())
}

/// Write `cfg` to `path`, creating parent directories.
pub fn save_config_to(cfg: &AppConfig, path: &std::path::Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, cfg.to_toml()?)?;
    Ok(())
}

/// Return the default config file path (for init and show).
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push("douban-meta");
        p.push("config.toml");
        p
    })
}
