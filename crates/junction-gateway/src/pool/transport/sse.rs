//! SSE transport
//!
//! Connects to legacy SSE backends: a long-lived streaming GET for
//! server-to-client events, with client-to-server messages POSTed to the
//! companion endpoint the backend advertises during the stream handshake.

use std::time::Duration;

use async_trait::async_trait;
use rmcp::transport::sse_client::{SseClientConfig, SseClientTransport};
use rmcp::ServiceExt;
use tracing::info;

use junction_core::TransportKind;

use super::{GatewayClientHandler, McpClient, Transport};
use crate::error::ConnectError;

/// Connector for legacy SSE backends.
pub struct SseTransport {
    name: String,
    url: String,
    connect_timeout: Duration,
}

impl SseTransport {
    pub fn new(name: String, url: String, connect_timeout: Duration) -> Self {
        Self {
            name,
            url,
            connect_timeout,
        }
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn connect(&self) -> Result<McpClient, ConnectError> {
        info!(backend = %self.name, url = %self.url, "connecting to SSE backend");

        url::Url::parse(&self.url).map_err(|e| ConnectError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        // No client-level timeout on the reqwest client: the event stream is
        // long-lived. The handshake itself is bounded below.
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConnectError::Handshake(format!("failed to build HTTP client: {e}")))?;

        let config = SseClientConfig {
            sse_endpoint: self.url.clone().into(),
            ..Default::default()
        };

        let open_stream = SseClientTransport::start_with_client(http_client, config);
        let transport = match tokio::time::timeout(self.connect_timeout, open_stream).await {
            Ok(Ok(transport)) => transport,
            Ok(Err(e)) => {
                return Err(ConnectError::Handshake(format!(
                    "failed to open event stream: {e}"
                )))
            }
            Err(_) => return Err(ConnectError::Timeout(self.connect_timeout)),
        };

        let handler = GatewayClientHandler::new(&self.name);
        let connect = handler.serve(transport);
        let client = match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => return Err(ConnectError::Handshake(e.to_string())),
            Err(_) => return Err(ConnectError::Timeout(self.connect_timeout)),
        };

        info!(backend = %self.name, "SSE backend connected");
        Ok(client)
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Sse
    }

    fn description(&self) -> String {
        format!("sse:{}", self.url)
    }
}
