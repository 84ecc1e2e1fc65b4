//! Application configuration and on-disk layout.
//!
//! Nothing in the crate reaches for a global path: a [`Paths`] value is
//! built once from a home directory and handed to each component.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Configuration file name inside the home directory.
pub const CONFIG_FILE: &str = "config.json";

/// Credential cache file name inside the home directory.
pub const TOKEN_CACHE_FILE: &str = ".token_cache.json";

/// Template directory name.
pub const TEMPLATES_DIR: &str = "templates";

/// Audit log directory name.
pub const SENT_DIR: &str = "sent";

/// Default authority host for the identity provider.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Default Microsoft Graph base URL.
pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

/// Default upper bound on the interactive sign-in wait.
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 900;

/// Default bound on a single HTTP request, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Where the credential cache blob is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// `.token_cache.json` in the home directory.
    #[default]
    File,
    /// System keyring (requires the `keyring` feature).
    Keyring,
}

/// Persistent application configuration (`config.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application (client) id of the app registration.
    pub client_id: String,
    /// Directory (tenant) id.
    pub tenant_id: String,
    /// Identity provider host.
    #[serde(default = "default_authority_host")]
    pub authority_host: String,
    /// Graph API base URL.
    #[serde(default = "default_graph_endpoint")]
    pub graph_endpoint: String,
    /// Credential cache storage.
    #[serde(default)]
    pub cache_backend: CacheBackend,
    /// Upper bound on the interactive sign-in wait, in seconds.
    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,
    /// Upper bound on any single HTTP request, in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_authority_host() -> String {
    DEFAULT_AUTHORITY_HOST.to_string()
}

fn default_graph_endpoint() -> String {
    DEFAULT_GRAPH_ENDPOINT.to_string()
}

const fn default_auth_timeout_secs() -> u64 {
    DEFAULT_AUTH_TIMEOUT_SECS
}

const fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl AppConfig {
    /// Creates a configuration with default endpoints.
    #[must_use]
    pub fn new(client_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            tenant_id: tenant_id.into(),
            authority_host: default_authority_host(),
            graph_endpoint: default_graph_endpoint(),
            cache_backend: CacheBackend::default(),
            auth_timeout_secs: DEFAULT_AUTH_TIMEOUT_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }

    /// Loads and validates the configuration file.
    ///
    /// # Errors
    ///
    /// `ConfigMissing` if the file does not exist, `Config` if required
    /// fields are empty, `Serde`/`Io` for unreadable files.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigMissing(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Writes the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Checks that the required identifiers are present.
    ///
    /// # Errors
    ///
    /// Returns `Config` naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("client_id is empty".into()));
        }
        if self.tenant_id.trim().is_empty() {
            return Err(Error::Config("tenant_id is empty".into()));
        }
        Ok(())
    }

    /// Interactive sign-in bound as a duration.
    #[must_use]
    pub const fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    /// Per-request HTTP bound as a duration; never below one second.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }
}

/// Filesystem layout rooted at one home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Home directory.
    pub root: PathBuf,
    /// `config.json`.
    pub config_file: PathBuf,
    /// Credential cache blob.
    pub token_cache: PathBuf,
    /// Message templates.
    pub templates_dir: PathBuf,
    /// Audit records.
    pub sent_dir: PathBuf,
}

impl Paths {
    /// Derives the layout from a home directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_file: root.join(CONFIG_FILE),
            token_cache: root.join(TOKEN_CACHE_FILE),
            templates_dir: root.join(TEMPLATES_DIR),
            sent_dir: root.join(SENT_DIR),
            root,
        }
    }

    /// Creates the template and audit directories if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.templates_dir)?;
        std::fs::create_dir_all(&self.sent_dir)?;
        Ok(())
    }
}
