//! Gateway error taxonomy
//!
//! `ConnectError` covers transport-level failures while establishing a backend
//! session; a backend that fails this way is logged and omitted from the
//! active set, never surfaced to the downstream caller. `RouteError` covers
//! failures while routing a caller request to a backend; these do reach the
//! caller, with backend application errors passed through unchanged.

use std::time::Duration;

use rmcp::{ErrorData, ServiceError};
use thiserror::Error;

/// Failure to establish a backend session.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("command not found: {0}. Ensure it's installed and in PATH.")]
    CommandNotFound(String),
    #[error("failed to spawn process: {0}")]
    Spawn(String),
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("MCP handshake failed: {0}")]
    Handshake(String),
    #[error("connection timed out after {0:?}")]
    Timeout(Duration),
    #[error("authorization failed: {0}")]
    Authorization(String),
}

/// Failure while routing an invoke request to its owning backend.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The identifier is not in the routing table built by the last list call.
    #[error("unknown {kind} '{identifier}'")]
    UnknownCapability {
        kind: &'static str,
        identifier: String,
    },
    /// Application error returned by the owning backend, passed through
    /// without translation.
    #[error("{}", .0.message)]
    Upstream(ErrorData),
    /// The backend's transport failed mid-request.
    #[error("backend '{backend}' request failed: {message}")]
    Transport { backend: String, message: String },
}

impl RouteError {
    pub fn from_service_error(backend: &str, err: ServiceError) -> Self {
        match err {
            ServiceError::McpError(data) => RouteError::Upstream(data),
            other => RouteError::Transport {
                backend: backend.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Map to the wire error returned to the downstream caller. Upstream
    /// application errors are returned verbatim.
    pub fn into_error_data(self) -> ErrorData {
        match self {
            RouteError::UnknownCapability { .. } => {
                ErrorData::invalid_params(self.to_string(), None)
            }
            RouteError::Upstream(data) => data,
            RouteError::Transport { .. } => ErrorData::internal_error(self.to_string(), None),
        }
    }
}
