//! TOML-based configuration for gitdesk.
//!
//! Secrets are never written to the file. The GitHub token is referenced by
//! the name of an environment variable and resolved at runtime via
//! [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diff::DiffAlgorithm;
use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Local working copy settings.
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Hosting API settings.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Commit comparison settings.
    #[serde(default)]
    pub diff: DiffConfig,

    /// Branch selection and merge request settings.
    #[serde(default)]
    pub merge: MergeConfig,

    #[serde(default)]
    pub log: LogConfig,
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Path to the local repository (working copy or bare).
    #[serde(default = "default_repository_path")]
    pub path: PathBuf,

    /// Remote used for fetching and as the merge target namespace.
    #[serde(default = "default_remote")]
    pub remote: String,
}

fn default_repository_path() -> PathBuf {
    PathBuf::from(".")
}
fn default_remote() -> String {
    "origin".into()
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: default_repository_path(),
            remote: default_remote(),
        }
    }
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// API base URL (override for GitHub Enterprise).
    #[serde(default = "default_github_api_url")]
    pub api_url: String,

    /// Repository in `owner/repo` format. Derived from the remote URL when
    /// absent.
    #[serde(default)]
    pub repo: Option<String>,

    /// Environment variable holding the personal access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
            repo: None,
            token_env: default_token_env(),
            token: None,
        }
    }
}

impl GitHubConfig {
    /// The configured repository split into `(owner, name)`.
    pub fn owner_repo(&self) -> Option<(&str, &str)> {
        self.repo.as_deref()?.split_once('/')
    }
}

// ---------------------------------------------------------------------------
// Diff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    #[serde(default)]
    pub algorithm: DiffAlgorithm,

    /// Read blobs of both revisions concurrently.
    #[serde(default = "default_true")]
    pub parallel_reads: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            algorithm: DiffAlgorithm::default(),
            parallel_reads: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Fetch the remote before listing branches (failures only warn).
    #[serde(default = "default_true")]
    pub fetch_before_load: bool,

    /// Preferred default target branches, in priority order.
    #[serde(default = "default_targets")]
    pub default_targets: Vec<String>,
}

fn default_targets() -> Vec<String> {
    vec!["main".into(), "master".into()]
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            fetch_before_load: true,
            default_targets: default_targets(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

/// `<config dir>/gitdesk/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gitdesk").join("config.toml"))
}

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Resolve the token environment variable.
    ///
    /// A missing variable logs a warning but does not fail; read-only
    /// commands work without a token.
    pub fn resolve_env_vars(&mut self) {
        info!("resolving environment variable references in config");
        self.github.token = resolve_optional_env(&self.github.token_env, "github.token_env");
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repository.path".into(),
                detail: "repository path must not be empty".into(),
            });
        }
        if self.repository.remote.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "repository.remote".into(),
                detail: "remote name must not be empty".into(),
            });
        }
        if let Some(repo) = &self.github.repo {
            let valid = matches!(repo.split_once('/'), Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/'));
            if !valid {
                return Err(ConfigError::InvalidValue {
                    field: "github.repo".into(),
                    detail: "GitHub repo must be in 'owner/repo' format".into(),
                });
            }
        }
        if self.github.api_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "github.api_url".into(),
                detail: "API URL must not be empty".into(),
            });
        }
        if self.merge.default_targets.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "merge.default_targets".into(),
                detail: "target branch names must not be empty".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars();
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
