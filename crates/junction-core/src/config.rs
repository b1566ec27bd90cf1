//! Gateway configuration
//!
//! One JSON file declares the inbound endpoint and the list of backends.
//! Loading and validation happen once at startup; an invalid configuration
//! aborts the process before anything is connected.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::BackendDeclaration;

const DEFAULT_BIND: &str = "127.0.0.1:8642";
const DEFAULT_CALLBACK_BIND: &str = "127.0.0.1:8643";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Where the gateway itself listens for its downstream caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListenSpec {
    /// Serve on the gateway process's own stdin/stdout.
    Stdio,
    /// Legacy SSE: `GET /sse` event stream plus `POST /message`.
    Sse {
        #[serde(default = "default_bind")]
        bind: String,
    },
    /// Streamable HTTP on `/mcp`, with a `/healthz` route alongside.
    Http {
        #[serde(default = "default_bind")]
        bind: String,
    },
}

impl Default for ListenSpec {
    fn default() -> Self {
        ListenSpec::Stdio
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_callback_bind() -> String {
    DEFAULT_CALLBACK_BIND.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_shutdown_grace_secs() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_SECS
}

/// Top-level gateway configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub listen: ListenSpec,
    pub backends: Vec<BackendDeclaration>,
    /// Per-backend connect budget. A backend that exceeds it is omitted.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Grace period for each backend's teardown before its transport is dropped.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// Local bind for the OAuth callback listener.
    #[serde(default = "default_callback_bind")]
    pub oauth_callback_bind: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("backend name must not be empty")]
    EmptyBackendName,
    #[error("duplicate backend name '{0}'")]
    DuplicateBackendName(String),
    #[error("invalid bind address '{addr}': {reason}")]
    InvalidBind { addr: String, reason: String },
}

impl GatewayConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: GatewayConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Backend names must be unique: they key the `[name]` capability labels
    /// and the routing tables.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for backend in &self.backends {
            if backend.name.is_empty() {
                return Err(ConfigError::EmptyBackendName);
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(ConfigError::DuplicateBackendName(backend.name.clone()));
            }
        }
        if let ListenSpec::Sse { bind } | ListenSpec::Http { bind } = &self.listen {
            parse_bind(bind)?;
        }
        parse_bind(&self.oauth_callback_bind)?;
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Socket address of the OAuth callback listener.
    pub fn oauth_callback_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_bind(&self.oauth_callback_bind)
    }

    /// Base URL redirect URIs are built from.
    pub fn oauth_callback_base(&self) -> String {
        format!("http://{}", self.oauth_callback_bind)
    }

    /// True when at least one backend may need the interactive OAuth flow.
    pub fn needs_oauth_callbacks(&self) -> bool {
        self.backends.iter().any(|b| {
            matches!(
                &b.transport,
                crate::backend::TransportSpec::Http { oauth: Some(_), .. }
            )
        })
    }
}

fn parse_bind(addr: &str) -> Result<SocketAddr, ConfigError> {
    addr.parse().map_err(|e| ConfigError::InvalidBind {
        addr: addr.to_string(),
        reason: format!("{e}"),
    })
}
