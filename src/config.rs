//! Configuration loading
//!
//! A TOML file at `~/.config/dochubfs/config.toml` supplies the catalog
//! address and API token; command-line flags and environment variables
//! override it. The file is optional when both overrides are given.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the catalog service, e.g. `https://dochub.be`.
    pub base_url: Url,
    /// API token sent as `Authorization: Token <token>`.
    pub token: String,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Content cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Ceiling on total cached document bytes, in megabytes.
    pub max_size_mb: u32,
    /// Seconds a cached document stays valid before the next read
    /// re-fetches it.
    pub content_ttl_secs: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size_mb: 100,
            content_ttl_secs: 300,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no config file at {0} and no --base-url/--token given")]
    Missing(PathBuf),
    #[error("could not determine a config directory for this platform")]
    NoConfigDir,
    #[error("could not read {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("could not parse {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}

impl Config {
    /// Default config file location for this platform.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("dochubfs").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Read(path.to_path_buf(), err))?;
        toml::from_str(&raw).map_err(|err| ConfigError::Parse(path.to_path_buf(), err))
    }

    /// Load the config file (if any) and apply overrides on top. When the
    /// file is absent, both `base_url` and `token` must be supplied.
    pub fn resolve(
        path: Option<PathBuf>,
        base_url: Option<Url>,
        token: Option<String>,
    ) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            Self::load(&path)?
        } else {
            match (&base_url, &token) {
                (Some(base_url), Some(token)) => Self {
                    base_url: base_url.clone(),
                    token: token.clone(),
                    cache: CacheConfig::default(),
                },
                _ => return Err(ConfigError::Missing(path)),
            }
        };

        if let Some(base_url) = base_url {
            config.base_url = base_url;
        }
        if let Some(token) = token {
            config.token = token;
        }
        Ok(config)
    }
}
