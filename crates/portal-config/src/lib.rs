//! Credential discovery for the portal CLI.
//!
//! Credentials come from `PORTAL_CREDENTIALS=user:password` or, when that is
//! unset or has no colon, from `.portalrc` TOML files: `~/.portalrc` first, then the nearest
//! `.portalrc` from the working directory upward. The nearer file wins key
//! by key. Each file holds one table per environment:
//!
//! ```toml
//! [Default]
//! user = "dev@example.com"
//! password = "hunter2"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::BaseDirs;
use figment::{
    Figment,
    providers::{Format, Toml},
};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use url::Url;

use portal_core::{Credentials, Endpoints, PortalConfig};

/// Environment variable holding `user:password`.
pub const CREDENTIALS_VAR: &str = "PORTAL_CREDENTIALS";
/// Environment variable naming the `.portalrc` table to read.
pub const ENVIRONMENT_VAR: &str = "PORTAL_ENVIRONMENT";
pub const DEFAULT_ENVIRONMENT: &str = "Default";
pub const RC_FILE_NAME: &str = ".portalrc";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no credentials found for environment '{environment}'")]
    MissingCredentials { environment: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Sources ─────────────────────────────────────────────────────────

/// Everything credential resolution reads from the outside world.
///
/// [`CredentialSources::from_env`] fills it from the process; tests build
/// one by hand.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    /// Value of `PORTAL_CREDENTIALS`.
    pub credentials: Option<String>,
    /// Value of `PORTAL_ENVIRONMENT` (or the `--environment` flag).
    pub environment: Option<String>,
    pub home: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
}

impl CredentialSources {
    pub fn from_env() -> Self {
        Self {
            credentials: std::env::var(CREDENTIALS_VAR).ok(),
            environment: std::env::var(ENVIRONMENT_VAR).ok(),
            home: BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf()),
            cwd: std::env::current_dir().ok(),
        }
    }

    /// Override the environment name when `environment` is set.
    pub fn with_environment(mut self, environment: Option<String>) -> Self {
        if environment.is_some() {
            self.environment = environment;
        }
        self
    }

    /// Selected `.portalrc` table name.
    pub fn environment(&self) -> &str {
        self.environment
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_ENVIRONMENT)
    }

    /// `.portalrc` files to read, lowest precedence first.
    pub fn rc_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Some(home) = &self.home {
            let path = home.join(RC_FILE_NAME);
            if path.is_file() {
                files.push(path);
            }
        }
        if let Some(nearest) = self.cwd.as_deref().and_then(nearest_rc_file) {
            if !files.contains(&nearest) {
                files.push(nearest);
            }
        }
        files
    }
}

fn nearest_rc_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(RC_FILE_NAME))
        .find(|path| path.is_file())
}

// ── Resolution ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RcSection {
    user: Option<String>,
    password: Option<String>,
}

/// Resolve login credentials from `sources`.
pub fn resolve_credentials(sources: &CredentialSources) -> Result<Credentials, ConfigError> {
    if let Some(raw) = sources.credentials.as_deref().filter(|v| !v.is_empty()) {
        match raw.split_once(':') {
            Some((user, password)) => return Ok(Credentials::new(user, password)),
            None => warn!("{CREDENTIALS_VAR} is not 'user:password', trying {RC_FILE_NAME}"),
        }
    }

    let environment = sources.environment();
    let figment = sources
        .rc_files()
        .iter()
        .fold(Figment::new(), |figment, path| figment.merge(Toml::file(path)));
    let section: RcSection = figment.focus(environment).extract()?;

    match section {
        RcSection {
            user: Some(user),
            password: Some(password),
        } if !user.is_empty() => Ok(Credentials::new(user, password)),
        _ => Err(ConfigError::MissingCredentials {
            environment: environment.to_owned(),
        }),
    }
}

/// Build the client configuration: credentials plus optional timeout and
/// base URL overrides.
pub fn portal_config(
    sources: &CredentialSources,
    timeout: Option<Duration>,
    base_url: Option<&Url>,
) -> Result<PortalConfig, ConfigError> {
    let mut config = PortalConfig::new(resolve_credentials(sources)?);
    if let Some(timeout) = timeout {
        config = config.with_timeout(timeout);
    }
    if let Some(base) = base_url {
        let endpoints = Endpoints::rooted_at(base).map_err(|e| ConfigError::Validation {
            field: "base URL".into(),
            reason: e.to_string(),
        })?;
        config = config.with_endpoints(endpoints);
    }
    Ok(config)
}
