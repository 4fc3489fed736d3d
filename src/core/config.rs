//! core::config
//!
//! Configuration schema and loading.
//!
//! The store is configured once at service startup from a TOML file:
//!
//! ```toml
//! workspace_root = "/var/stagehand/checkouts"
//! provider_base_url = "https://github.com/acme-sites"
//! remote = "origin"
//! lite_whitelist = ["marketing-site", "docs-site"]
//! ```
//!
//! `lite_whitelist` gates dual-branch propagation: only listed
//! repositories receive staging-lite writes. `provider_base_url` is the
//! prefix every repository's `origin` remote is expected to carry, used by
//! working-copy validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::RepoName;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Config file is not valid TOML or violates the schema.
    #[error("cannot parse config {path}: {message}")]
    Parse {
        /// The path that failed.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// A config value failed validation.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Store configuration.
///
/// # Example
///
/// ```
/// use stagehand::core::config::StoreConfig;
/// use stagehand::core::types::RepoName;
///
/// let config: StoreConfig = toml::from_str(r#"
///     workspace_root = "/var/stagehand"
///     provider_base_url = "https://github.com/acme-sites"
///     lite_whitelist = ["marketing-site"]
/// "#).unwrap();
///
/// config.validate().unwrap();
/// let repo = RepoName::new("marketing-site").unwrap();
/// assert_eq!(
///     config.expected_remote_url(&repo),
///     "https://github.com/acme-sites/marketing-site.git"
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Directory all working copies live under.
    pub workspace_root: PathBuf,

    /// URL prefix of the hosted Git provider, without trailing slash.
    pub provider_base_url: String,

    /// Remote name (default: "origin").
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Repositories that receive staging-lite propagation.
    #[serde(default)]
    pub lite_whitelist: Vec<RepoName>,
}

fn default_remote() -> String {
    "origin".to_string()
}

impl StoreConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for IO failures, parse failures, or invalid
    /// values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config: StoreConfig = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace_root.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "workspace_root cannot be empty".into(),
            ));
        }

        if self.provider_base_url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "provider_base_url cannot be empty".into(),
            ));
        }
        if self.provider_base_url.ends_with('/') {
            return Err(ConfigError::InvalidValue(
                "provider_base_url must not end with '/'".into(),
            ));
        }

        if self.remote.is_empty() {
            return Err(ConfigError::InvalidValue("remote cannot be empty".into()));
        }

        Ok(())
    }

    /// The `origin` URL a valid working copy of `repo` must carry.
    pub fn expected_remote_url(&self, repo: &RepoName) -> String {
        format!("{}/{}.git", self.provider_base_url, repo.as_str())
    }
}
