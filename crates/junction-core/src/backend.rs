//! Backend declarations
//!
//! A backend is one independently operated MCP server the gateway connects to
//! as a client. Declarations are immutable inputs supplied by configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// OAuth settings for an HTTP backend.
///
/// Only the protocol handshake toward the backend is covered here; the
/// interactive part (opening a browser, receiving the redirect) is handled by
/// the gateway's authorization machinery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Authorization server issuer. Defaults to the backend URL's origin.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Scopes to request during authorization.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Pre-registered client ID at the authorization server.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Client secret, if the registration has one.
    #[serde(default)]
    pub client_secret: Option<String>,
}

/// Transport used to reach a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportSpec {
    /// Local child process speaking MCP over stdin/stdout.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
    /// Legacy SSE server: long-lived event stream plus a message POST endpoint.
    Sse { url: String },
    /// Streamable HTTP server, optionally OAuth-protected.
    Http {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
        #[serde(default)]
        oauth: Option<OAuthConfig>,
    },
}

/// Transport discriminant, used for logging and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    Sse,
    Http,
}

impl TransportSpec {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportSpec::Stdio { .. } => TransportKind::Stdio,
            TransportSpec::Sse { .. } => TransportKind::Sse,
            TransportSpec::Http { .. } => TransportKind::Http,
        }
    }

    /// URL for network transports, None for stdio.
    pub fn url(&self) -> Option<&str> {
        match self {
            TransportSpec::Stdio { .. } => None,
            TransportSpec::Sse { url } | TransportSpec::Http { url, .. } => Some(url),
        }
    }

    /// Short description for logging.
    pub fn description(&self) -> String {
        match self {
            TransportSpec::Stdio { command, .. } => format!("stdio:{}", command),
            TransportSpec::Sse { url } => format!("sse:{}", url),
            TransportSpec::Http { url, .. } => format!("http:{}", url),
        }
    }
}

/// One backend the gateway aggregates. Names are unique within a gateway and
/// become the `[name]` label prefixed onto aggregated capability descriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendDeclaration {
    pub name: String,
    pub transport: TransportSpec,
}
