//! Daemon configuration loaded from TOML.

use anyhow::{Context, Result, bail};
pub use model::{ProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

/// Config file read when `-c` is not given.
pub const DEFAULT_CONFIG: &str = "modelplex.toml";

/// Socket file name inside the runtime directory.
pub const SOCKET_NAME: &str = "modelplex.sock";

/// Default socket path: `$XDG_RUNTIME_DIR/modelplex.sock`, falling back
/// to the temp directory.
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(SOCKET_NAME)
}

/// Top-level daemon configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream providers (`[[providers]]` array).
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Unix socket path. The CLI `-s` flag wins over this.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
    /// Default tracing directive when `RUST_LOG` is unset.
    pub log_level: String,
    /// Largest accepted request body, in bytes.
    pub max_request_size: usize,
    /// Upper bound for a non-streaming upstream call, and for the gap
    /// between two chunks of a stream.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            log_level: "info".to_owned(),
            max_request_size: 10 * 1024 * 1024,
            request_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl DaemonConfig {
    /// Parse a TOML string, expanding `${ENV_VAR}` references first.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let expanded = crate::utils::expand_env_vars(toml_str);
        let config: Self = toml::from_str(&expanded).context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Check the cross-entry rules. Duplicate model ids are left to the
    /// registry, which reports them as `DuplicateModel`.
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            bail!("at least one [[providers]] entry is required");
        }
        let mut names = HashSet::new();
        for provider in &self.providers {
            provider.validate()?;
            if !names.insert(provider.name.as_str()) {
                bail!("duplicate provider name '{}'", provider.name);
            }
        }
        if self.server.max_request_size == 0 {
            bail!("server.max_request_size must be greater than zero");
        }
        if self.server.request_timeout_secs == 0 {
            bail!("server.request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Resolve the socket path: explicit override, then config, then
    /// [`default_socket_path`].
    pub fn socket_path(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.server.socket_path.clone())
            .unwrap_or_else(default_socket_path)
    }
}
