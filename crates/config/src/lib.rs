#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for osup
//!
//! Values are layered: built-in defaults, then `config.toml`, then `OSUP_*`
//! environment variables. The binary applies its flags last and calls
//! [`Config::validate`] on the result.

pub mod constants;

pub use constants as fixed_paths;

use osup_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;

/// Merged updater configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_max_parallel_downloads")]
    pub max_parallel_downloads: usize,
}

/// Where the updater reads and writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    #[serde(default = "default_install_root")]
    pub install_root: PathBuf,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_mix_state_dir")]
    pub mix_state_dir: PathBuf,
    /// Relative to `install_root`
    #[serde(default = "default_bundles_dir")]
    pub bundles_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub content_url: Option<String>,
    pub version_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
    /// Update stream format number
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_parallel_downloads: default_max_parallel_downloads(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            install_root: default_install_root(),
            state_dir: default_state_dir(),
            mix_state_dir: default_mix_state_dir(),
            bundles_dir: default_bundles_dir(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            content_url: None,
            version_url: None,
            timeout: default_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            format: default_format(),
        }
    }
}

fn default_max_parallel_downloads() -> usize {
    1
}

fn default_install_root() -> PathBuf {
    PathBuf::from(constants::DEFAULT_INSTALL_ROOT)
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(constants::DEFAULT_STATE_DIR)
}

fn default_mix_state_dir() -> PathBuf {
    PathBuf::from(constants::DEFAULT_MIX_STATE_DIR)
}

fn default_bundles_dir() -> PathBuf {
    PathBuf::from(constants::DEFAULT_BUNDLES_DIR)
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1 // 1 second
}

fn default_format() -> String {
    "1".to_string()
}

impl Config {
    /// `<config dir>/osup/config.toml`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the platform has no config directory.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("osup").join("config.toml"))
    }

    /// # Errors
    ///
    /// Returns `NotFound` if `path` cannot be read and `ParseError` for bad
    /// TOML or mistyped values.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        Ok(toml::from_str(&contents)?)
    }

    /// Read the default config file, or use defaults when there is none
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;
        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// An explicit `path` must exist; without one the default location is
    /// optional
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Apply `OSUP_*` overrides
    ///
    /// # Errors
    ///
    /// Returns `InvalidValue` for an empty path or a number that does not
    /// parse.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Ok(root) = std::env::var("OSUP_PATH") {
            self.paths.install_root = non_empty_path("OSUP_PATH", root)?;
        }

        if let Ok(state) = std::env::var("OSUP_STATE_DIR") {
            self.paths.state_dir = non_empty_path("OSUP_STATE_DIR", state)?;
        }

        if let Ok(url) = std::env::var("OSUP_CONTENT_URL") {
            self.network.content_url = Some(url);
        }

        if let Ok(url) = std::env::var("OSUP_VERSION_URL") {
            self.network.version_url = Some(url);
        }

        if let Ok(downloads) = std::env::var("OSUP_MAX_PARALLEL_DOWNLOADS") {
            self.general.max_parallel_downloads =
                parse_env("OSUP_MAX_PARALLEL_DOWNLOADS", downloads)?;
        }

        if let Ok(retries) = std::env::var("OSUP_MAX_RETRIES") {
            self.network.retries = parse_env("OSUP_MAX_RETRIES", retries)?;
        }

        if let Ok(delay) = std::env::var("OSUP_RETRY_DELAY") {
            self.network.retry_delay = parse_env("OSUP_RETRY_DELAY", delay)?;
        }

        Ok(())
    }

    /// Check the merged configuration for values the pipeline cannot run with
    ///
    /// # Errors
    ///
    /// Returns an error for a zero download limit, a relative install root or
    /// state directory, or a missing content URL when `fetching` is set.
    pub fn validate(&self, fetching: bool) -> Result<(), Error> {
        if self.general.max_parallel_downloads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "general.max_parallel_downloads".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        for (field, path) in [
            ("paths.install_root", &self.paths.install_root),
            ("paths.state_dir", &self.paths.state_dir),
        ] {
            if !path.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: path.display().to_string(),
                }
                .into());
            }
        }

        if fetching && self.network.content_url.is_none() {
            return Err(ConfigError::MissingField {
                field: "network.content_url".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Content base URL without a trailing slash
    #[must_use]
    pub fn content_url(&self) -> Option<&str> {
        self.network
            .content_url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
    }

    /// Where the server publishes the latest release number for this format
    #[must_use]
    pub fn latest_version_url(&self) -> Option<String> {
        self.network.version_url.as_deref().map(|base| {
            format!(
                "{}/version/format{}/latest",
                base.trim_end_matches('/'),
                self.network.format
            )
        })
    }

    /// Directory holding bundle tracking files
    #[must_use]
    pub fn bundles_path(&self) -> PathBuf {
        self.paths.install_root.join(&self.paths.bundles_dir)
    }

    /// Directory for debug log files
    #[must_use]
    pub fn logs_path(&self) -> PathBuf {
        self.paths.state_dir.join(constants::LOGS_DIR)
    }

    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.network.timeout)
    }

    #[must_use]
    pub fn retry_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.network.retry_delay)
    }
}

fn parse_env<T: FromStr>(field: &str, value: String) -> Result<T, Error> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()
    })
}

fn non_empty_path(field: &str, value: String) -> Result<PathBuf, Error> {
    if value.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into());
    }
    Ok(PathBuf::from(value))
}
