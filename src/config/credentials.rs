//! Connection credentials for the tracker instance.
//!
//! Credentials are validated and normalized at construction and immutable
//! afterwards; a misconfiguration is a fatal error surfaced here, never at
//! call time.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::warn;

use super::{ConfigError, Result};

/// Environment variable names consumed by [`Credentials::from_env`].
pub const ENV_URL: &str = "TRACKWIRE_URL";
pub const ENV_USER: &str = "TRACKWIRE_USER";
pub const ENV_TOKEN: &str = "TRACKWIRE_TOKEN";
pub const ENV_AUTH: &str = "TRACKWIRE_AUTH";
pub const ENV_PROJECT: &str = "TRACKWIRE_PROJECT";

/// How requests are authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// `Authorization: Basic base64(principal:secret)` on every call.
    #[default]
    Basic,
    /// A short-lived bearer token obtained by a login call and refreshed on
    /// expiry.
    Bearer,
}

impl AuthMode {
    fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "basic" => Ok(AuthMode::Basic),
            "bearer" => Ok(AuthMode::Bearer),
            other => Err(ConfigError::Validation(format!(
                "auth mode must be 'basic' or 'bearer', got '{}'",
                other
            ))),
        }
    }
}

/// Credentials for a tracker instance.
#[derive(Clone)]
pub struct Credentials {
    base_url: String,
    principal: String,
    secret: String,
    auth: AuthMode,
    default_project: Option<String>,
}

impl Credentials {
    /// Create and validate credentials.
    ///
    /// The base URL is normalized (trailing slashes stripped); empty base
    /// URL, principal, or secret is rejected.
    pub fn new(
        base_url: &str,
        principal: &str,
        secret: &str,
        auth: AuthMode,
        default_project: Option<String>,
    ) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(ConfigError::Validation("base URL cannot be empty".to_string()));
        }
        if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
            return Err(ConfigError::Validation(format!(
                "base URL '{}' must start with http:// or https://",
                base_url
            )));
        }
        if principal.trim().is_empty() {
            return Err(ConfigError::Validation("principal cannot be empty".to_string()));
        }
        if secret.is_empty() {
            return Err(ConfigError::Validation("secret cannot be empty".to_string()));
        }

        Ok(Self {
            base_url: normalize_base_url(base_url),
            principal: principal.to_string(),
            secret: secret.to_string(),
            auth,
            default_project: default_project.filter(|p| !p.is_empty()),
        })
    }

    /// Load credentials from the `TRACKWIRE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let base_url = require_env(ENV_URL)?;
        let principal = require_env(ENV_USER)?;
        let secret = require_env(ENV_TOKEN)?;
        let auth = match std::env::var(ENV_AUTH) {
            Ok(raw) if !raw.is_empty() => AuthMode::parse(&raw)?,
            _ => AuthMode::default(),
        };
        let default_project = std::env::var(ENV_PROJECT).ok();
        Self::new(&base_url, &principal, &secret, auth, default_project)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth
    }

    pub fn default_project(&self) -> Option<&str> {
        self.default_project.as_deref()
    }

    /// The raw secret, needed for login calls and Basic header assembly.
    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }

    /// Complete `Authorization: Basic ...` header value.
    pub fn basic_header(&self) -> String {
        let raw = format!("{}:{}", self.principal, self.secret);
        format!("Basic {}", BASE64.encode(raw.as_bytes()))
    }
}

// The secret must never leak into logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("base_url", &self.base_url)
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .field("auth", &self.auth)
            .field("default_project", &self.default_project)
            .finish()
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Validation(format!("{} is not set", name))),
    }
}

/// Normalize the base URL by removing trailing slashes.
fn normalize_base_url(url: &str) -> String {
    let url = url.trim_end_matches('/');

    if !url.starts_with("https://") && !url.contains("localhost") {
        warn!("URL does not use HTTPS: {}. This is insecure for production use.", url);
    }

    url.to_string()
}
