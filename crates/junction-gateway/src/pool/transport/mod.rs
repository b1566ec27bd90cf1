//! Backend transport abstraction
//!
//! One connector per supported transport, all producing the same live client
//! type. The factory selects a connector from the declaration's tagged spec,
//! keeping the pool transport-agnostic.

mod http;
mod sse;
mod stdio;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rmcp::{
    model::{ClientInfo, Implementation},
    service::RunningService,
    ClientHandler, RoleClient,
};

use junction_core::{BackendDeclaration, TransportKind, TransportSpec};

use crate::error::ConnectError;
use crate::oauth::OAuthManager;

pub use http::HttpTransport;
pub use sse::SseTransport;
pub use stdio::StdioTransport;

/// A live backend session.
pub type McpClient = RunningService<RoleClient, GatewayClientHandler>;

/// Client-side handler identifying the gateway to backends.
#[derive(Clone)]
pub struct GatewayClientHandler {
    info: ClientInfo,
}

impl GatewayClientHandler {
    pub fn new(backend: &str) -> Self {
        Self {
            info: ClientInfo {
                client_info: Implementation {
                    name: format!("junction-{backend}"),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }
}

impl ClientHandler for GatewayClientHandler {
    fn get_info(&self) -> ClientInfo {
        self.info.clone()
    }
}

/// One connector per transport kind.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the session, including the MCP handshake.
    async fn connect(&self) -> Result<McpClient, ConnectError>;

    fn kind(&self) -> TransportKind;

    /// Short description for logging.
    fn description(&self) -> String;
}

/// Builds the connector matching a backend declaration.
pub struct TransportFactory;

impl TransportFactory {
    pub fn create(
        backend: &BackendDeclaration,
        connect_timeout: Duration,
        oauth: Arc<OAuthManager>,
    ) -> Box<dyn Transport> {
        match &backend.transport {
            TransportSpec::Stdio { command, args, env } => Box::new(StdioTransport::new(
                backend.name.clone(),
                command.clone(),
                args.clone(),
                env.clone(),
                connect_timeout,
            )),
            TransportSpec::Sse { url } => Box::new(SseTransport::new(
                backend.name.clone(),
                url.clone(),
                connect_timeout,
            )),
            TransportSpec::Http {
                url,
                headers,
                oauth: oauth_config,
            } => Box::new(HttpTransport::new(
                backend.name.clone(),
                url.clone(),
                headers.clone(),
                oauth_config.clone(),
                oauth,
                connect_timeout,
            )),
        }
    }
}
