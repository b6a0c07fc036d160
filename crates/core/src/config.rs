//! TOML-based configuration for gitlab2gogs.
//!
//! Every section is optional; command-line flags override whatever the file
//! provides. The Gogs admin password is never stored in the file: the
//! `password_env` field names an environment variable that is resolved at
//! runtime via [`MigrationConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::git::remote_url::normalize_base_url;
use crate::gogs::DEFAULT_TOKEN_NAME;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Source-side settings.
    #[serde(default)]
    pub gitlab: GitLabConfig,

    /// Destination server settings.
    #[serde(default)]
    pub gogs: GogsConfig,

    /// Import run settings.
    #[serde(default)]
    pub import: ImportConfig,
}

// ---------------------------------------------------------------------------
// GitLab
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitLabConfig {
    /// Namespaces that are personal user namespaces rather than groups.
    #[serde(default)]
    pub users: Vec<String>,
}

// ---------------------------------------------------------------------------
// Gogs
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize, Deserialize)]
pub struct GogsConfig {
    /// Base URL, e.g. `https://gogs.example.com`.
    pub url: Option<String>,

    /// Administrative account name.
    pub admin: Option<String>,

    /// Name of the environment variable holding the admin password.
    pub password_env: Option<String>,

    /// Client label of the API tokens used for repository creation.
    #[serde(default = "default_token_name")]
    pub token_name: String,

    /// Resolved admin password (not serialized).
    #[serde(skip)]
    pub password: Option<String>,
}

fn default_token_name() -> String {
    DEFAULT_TOKEN_NAME.into()
}

impl Default for GogsConfig {
    fn default() -> Self {
        Self {
            url: None,
            admin: None,
            password_env: None,
            token_name: default_token_name(),
            password: None,
        }
    }
}

impl std::fmt::Debug for GogsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GogsConfig")
            .field("url", &self.url)
            .field("admin", &self.admin)
            .field("password_env", &self.password_env)
            .field("token_name", &self.token_name)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Parent directory for per-repository working areas. Defaults to the
    /// system temp directory.
    pub work_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl MigrationConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: MigrationConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `gogs.password_env` from the environment.
    ///
    /// A missing variable logs a warning but is not an error; the caller
    /// falls back to the command line or an interactive prompt.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.gogs.password_env {
            self.gogs.password = resolve_optional_env(env_name, "gogs.password_env");
        }
        Ok(())
    }

    /// Validate the configuration. Call after loading and resolving.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.gogs.url {
            if url.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "gogs.url".into(),
                    detail: "Gogs URL must not be empty".into(),
                });
            }
            normalize_base_url(url).map_err(|e| ConfigError::InvalidValue {
                field: "gogs.url".into(),
                detail: e.to_string(),
            })?;
        }
        if matches!(self.gogs.admin.as_deref(), Some(a) if a.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "gogs.admin".into(),
                detail: "admin user must not be empty".into(),
            });
        }
        if self.gogs.token_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "gogs.token_name".into(),
                detail: "token name must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Convenience: load, resolve env vars, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
