//! File and environment configuration for a connection context.
//!
//! A config file is plain TOML:
//!
//! ```toml
//! hostname = "game.example.com"
//! port = 1139
//! ```
//!
//! `SGS_HOST` and `SGS_PORT` override whatever the file says.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::ConnectionContext;
use crate::error::{ConfigError, ContextError};
use crate::io::IoHooks;

pub const DEFAULT_HOSTNAME: &str = "localhost";
pub const DEFAULT_PORT: i32 = 1139;

pub const HOST_ENV: &str = "SGS_HOST";
pub const PORT_ENV: &str = "SGS_PORT";

/// Addressing for one connection context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub hostname: String,
    pub port: i32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ContextConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded context config");
        Ok(config)
    }

    /// Applies `SGS_HOST` / `SGS_PORT` from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_overrides(std::env::var(HOST_ENV).ok(), std::env::var(PORT_ENV).ok())
    }

    fn apply_overrides(
        mut self,
        host: Option<String>,
        port: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(host) = host.filter(|h| !h.is_empty()) {
            self.hostname = host;
        }
        if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.clone()))?;
        }
        Ok(self)
    }
}

impl ConnectionContext {
    /// Same checks as [`ConnectionContext::new`].
    pub fn from_config(config: &ContextConfig, io_hooks: IoHooks) -> Result<Self, ContextError> {
        Self::new(&config.hostname, config.port, io_hooks)
    }
}
