//! Configuration for the tracker client.
//!
//! Credentials and settings can be supplied programmatically, through the
//! `TRACKWIRE_*` environment variables, or from a TOML file in the
//! platform config directory.

mod credentials;
mod settings;

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub use credentials::{
    AuthMode, Credentials, ENV_AUTH, ENV_PROJECT, ENV_TOKEN, ENV_URL, ENV_USER,
};
pub use settings::Settings;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Could not determine the platform config directory.
    #[error("could not determine config directory")]
    NoConfigDir,

    /// Error reading the config file.
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Error parsing the config file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Invalid configuration values.
    #[error("configuration error: {0}")]
    Validation(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// On-disk layout of the config file.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    credentials: Option<CredentialsSection>,
    #[serde(default)]
    settings: Settings,
}

#[derive(Debug, Deserialize)]
struct CredentialsSection {
    url: String,
    principal: String,
    secret: String,
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    default_project: Option<String>,
}

/// Loaded configuration.
#[derive(Debug)]
pub struct Config {
    /// Credentials, if the file carried a `[credentials]` section.
    pub credentials: Option<Credentials>,
    pub settings: Settings,
}

impl Config {
    /// Load from the default path, or defaults if no file exists.
    ///
    /// The default path is `<config dir>/trackwire/config.toml`.
    pub fn load() -> Result<Self> {
        let path = default_config_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self {
                credentials: None,
                settings: Settings::default(),
            });
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&raw)?;

        let credentials = match file.credentials {
            Some(section) => Some(section.into_credentials()?),
            None => None,
        };

        debug!(path = %path.display(), "config loaded");
        Ok(Self {
            credentials,
            settings: file.settings,
        })
    }
}

impl CredentialsSection {
    fn into_credentials(self) -> Result<Credentials> {
        let auth = match self.auth.as_deref() {
            Some("basic") | None => AuthMode::Basic,
            Some("bearer") => AuthMode::Bearer,
            Some(other) => {
                return Err(ConfigError::Validation(format!(
                    "auth mode must be 'basic' or 'bearer', got '{}'",
                    other
                )))
            }
        };
        Credentials::new(
            &self.url,
            &self.principal,
            &self.secret,
            auth,
            self.default_project,
        )
    }
}

/// Path of the config file in the platform config directory.
pub fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("trackwire").join("config.toml"))
}
