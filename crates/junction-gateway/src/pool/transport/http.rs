//! Streamable HTTP transport, with optional OAuth
//!
//! Connects to a backend over streamable HTTP. When the backend answers the
//! handshake with an authorization-required error, the connector runs the
//! interactive OAuth flow exactly once and retries with the bearer token. A
//! second authorization-required answer is fatal for this connect attempt.
//!
//! A declaration that carries its own `Authorization` header (a PAT, say)
//! never enters the OAuth flow: the operator already chose how to
//! authenticate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use tracing::{debug, info};

use junction_core::{OAuthConfig, TransportKind};

use super::{GatewayClientHandler, McpClient, Transport};
use crate::error::ConnectError;
use crate::oauth::OAuthManager;

/// Connector for streamable HTTP backends.
pub struct HttpTransport {
    name: String,
    url: String,
    headers: HashMap<String, String>,
    oauth_config: Option<OAuthConfig>,
    oauth: Arc<OAuthManager>,
    connect_timeout: Duration,
}

/// Outcome of one handshake attempt.
enum Attempt {
    Connected(McpClient),
    AuthRequired(String),
    Failed(ConnectError),
}

impl HttpTransport {
    pub fn new(
        name: String,
        url: String,
        headers: HashMap<String, String>,
        oauth_config: Option<OAuthConfig>,
        oauth: Arc<OAuthManager>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            name,
            url,
            headers,
            oauth_config,
            oauth,
            connect_timeout,
        }
    }

    /// Whether an error message indicates the backend wants authorization.
    fn requires_oauth(error: &str) -> bool {
        let lower = error.to_lowercase();
        [
            "401",
            "unauthorized",
            "auth required",
            "authrequired",
            "invalid_token",
            "www-authenticate",
            "access token",
            "bearer",
        ]
        .iter()
        .any(|marker| lower.contains(marker))
    }

    /// Headers from the declaration, applied to every request.
    fn build_default_headers(&self) -> Result<HeaderMap, ConnectError> {
        let mut header_map = HeaderMap::new();
        for (key, value) in &self.headers {
            let name =
                HeaderName::from_bytes(key.as_bytes()).map_err(|e| ConnectError::InvalidHeader {
                    name: key.clone(),
                    reason: e.to_string(),
                })?;
            let value = HeaderValue::from_str(value).map_err(|e| ConnectError::InvalidHeader {
                name: key.clone(),
                reason: e.to_string(),
            })?;
            header_map.insert(name, value);
        }
        Ok(header_map)
    }

    /// One handshake attempt with the given default headers.
    async fn attempt(&self, header_map: HeaderMap) -> Attempt {
        let client = match reqwest::Client::builder()
            .default_headers(header_map)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                return Attempt::Failed(ConnectError::Handshake(format!(
                    "failed to build HTTP client: {e}"
                )))
            }
        };

        let config = StreamableHttpClientTransportConfig::with_uri(self.url.clone());
        let transport = StreamableHttpClientTransport::with_client(client, config);
        let handler = GatewayClientHandler::new(&self.name);

        match tokio::time::timeout(self.connect_timeout, handler.serve(transport)).await {
            Ok(Ok(client)) => Attempt::Connected(client),
            Ok(Err(e)) => {
                let detail = e.to_string();
                if Self::requires_oauth(&detail) {
                    Attempt::AuthRequired(detail)
                } else {
                    Attempt::Failed(ConnectError::Handshake(detail))
                }
            }
            Err(_) => Attempt::Failed(ConnectError::Timeout(self.connect_timeout)),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn connect(&self) -> Result<McpClient, ConnectError> {
        info!(backend = %self.name, url = %self.url, "connecting to HTTP backend");

        url::Url::parse(&self.url).map_err(|e| ConnectError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        let header_map = self.build_default_headers()?;
        let has_explicit_auth = header_map.contains_key(AUTHORIZATION);
        if has_explicit_auth {
            debug!(backend = %self.name, "declaration carries an Authorization header, OAuth disabled");
        }

        match self.attempt(header_map.clone()).await {
            Attempt::Connected(client) => {
                info!(backend = %self.name, "HTTP backend connected");
                Ok(client)
            }
            Attempt::Failed(e) => Err(e),
            Attempt::AuthRequired(detail) if has_explicit_auth => {
                Err(ConnectError::Authorization(format!(
                    "backend rejected the declared Authorization header: {detail}"
                )))
            }
            Attempt::AuthRequired(detail) => {
                let Some(oauth_config) = &self.oauth_config else {
                    return Err(ConnectError::Authorization(format!(
                        "backend requires authorization but the declaration has no oauth \
                         configuration: {detail}"
                    )));
                };

                let token = self
                    .oauth
                    .acquire_token(&self.name, &self.url, oauth_config)
                    .await?;

                let mut authed = header_map;
                let value = HeaderValue::from_str(&token.authorization_header()).map_err(|e| {
                    ConnectError::Authorization(format!("token is not a valid header value: {e}"))
                })?;
                authed.insert(AUTHORIZATION, value);

                match self.attempt(authed).await {
                    Attempt::Connected(client) => {
                        info!(backend = %self.name, "HTTP backend connected after authorization");
                        Ok(client)
                    }
                    // One handshake per connect attempt: a second refusal is fatal.
                    Attempt::AuthRequired(detail) => Err(ConnectError::Authorization(format!(
                        "backend still requires authorization after a completed handshake: {detail}"
                    ))),
                    Attempt::Failed(e) => Err(e),
                }
            }
        }
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    fn description(&self) -> String {
        format!("http:{}", self.url)
    }
}
