//! OAuth 2.1 toward protected backends
//!
//! Implements the authorization code flow with PKCE used to reach
//! OAuth-protected HTTP backends. The interactive half (getting the operator
//! through the authorization server) is abstracted behind
//! [`AuthorizationHandler`]; the CLI supplies [`BrowserAuthorizer`], which
//! opens a browser and waits on the local callback endpoint.

mod callback;
mod discovery;
mod flow;
mod pending;
mod pkce;
mod token;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use junction_core::OAuthConfig;

use crate::error::ConnectError;

pub use callback::{callback_router, serve_callbacks};
pub use discovery::{OAuthDiscovery, OAuthMetadata};
pub use flow::{AuthorizationRequest, OAuthFlow};
pub use pending::{backend_key, backend_url, PendingAuthorizations};
pub use pkce::PkceChallenge;
pub use token::{OAuthToken, TokenResponse};

/// Invoked when a backend requires interactive authorization. Called at most
/// once per connect attempt; returns the authorization code delivered by the
/// redirect.
#[async_trait]
pub trait AuthorizationHandler: Send + Sync {
    async fn authorize(
        &self,
        backend: &str,
        backend_url: &str,
        authorization_url: &str,
    ) -> anyhow::Result<String>;
}

/// Coordinates one authorization handshake per connect attempt.
pub struct OAuthManager {
    http_client: reqwest::Client,
    callback_base: String,
    handler: Arc<dyn AuthorizationHandler>,
}

impl OAuthManager {
    pub fn new(callback_base: String, handler: Arc<dyn AuthorizationHandler>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            callback_base,
            handler,
        }
    }

    /// Run the full handshake for a backend: discover metadata, send the
    /// operator through authorization, exchange the code for a token.
    pub async fn acquire_token(
        &self,
        backend: &str,
        backend_url: &str,
        config: &OAuthConfig,
    ) -> Result<OAuthToken, ConnectError> {
        let issuer = config
            .issuer
            .clone()
            .or_else(|| origin_of(backend_url))
            .ok_or_else(|| {
                ConnectError::Authorization(format!(
                    "cannot derive an issuer from backend url '{backend_url}'"
                ))
            })?;

        let metadata = OAuthDiscovery::new(self.http_client.clone())
            .fetch(&issuer)
            .await
            .map_err(|e| ConnectError::Authorization(format!("metadata discovery failed: {e}")))?;

        let client_id = config.client_id.clone().ok_or_else(|| {
            ConnectError::Authorization(
                "oauth configuration has no client_id; register a client with the \
                 authorization server and declare it"
                    .to_string(),
            )
        })?;

        let key = backend_key(backend_url);
        let redirect_uri = format!("{}/oauth/{}/callback", self.callback_base, key);

        let flow = OAuthFlow::new(metadata, client_id, config.client_secret.clone());
        let request = flow
            .create_authorization_request(&redirect_uri, &config.scopes)
            .map_err(|e| ConnectError::Authorization(format!("bad authorization endpoint: {e}")))?;

        info!(backend = %backend, "backend requires authorization, starting interactive flow");

        let code = self
            .handler
            .authorize(backend, backend_url, &request.authorization_url)
            .await
            .map_err(|e| ConnectError::Authorization(e.to_string()))?;

        flow.exchange_code(&self.http_client, &code, &redirect_uri, &request.pkce_verifier)
            .await
            .map_err(|e| ConnectError::Authorization(e.to_string()))
    }
}

/// Scheme + authority of a URL, used as the default issuer.
fn origin_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    let mut origin = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        origin.push_str(&format!(":{port}"));
    }
    Some(origin)
}

/// Default interactive handler: opens the system browser and waits for the
/// redirect to land on the local callback endpoint.
pub struct BrowserAuthorizer {
    pending: Arc<PendingAuthorizations>,
    wait_timeout: Duration,
}

impl BrowserAuthorizer {
    pub fn new(pending: Arc<PendingAuthorizations>, wait_timeout: Duration) -> Self {
        Self {
            pending,
            wait_timeout,
        }
    }
}

#[async_trait]
impl AuthorizationHandler for BrowserAuthorizer {
    async fn authorize(
        &self,
        backend: &str,
        backend_url: &str,
        authorization_url: &str,
    ) -> anyhow::Result<String> {
        // Register before opening the browser so the redirect cannot race us.
        let rx = self.pending.register(&backend_key(backend_url));

        info!(backend = %backend, "opening browser for authorization");
        if let Err(e) = open::that(authorization_url) {
            anyhow::bail!(
                "could not open a browser ({e}); visit this URL manually: {authorization_url}"
            );
        }

        match tokio::time::timeout(self.wait_timeout, rx).await {
            Ok(Ok(Ok(code))) => Ok(code),
            Ok(Ok(Err(error))) => anyhow::bail!("authorization server reported: {error}"),
            Ok(Err(_)) => anyhow::bail!("authorization attempt was superseded"),
            Err(_) => anyhow::bail!(
                "timed out after {:?} waiting for the authorization callback",
                self.wait_timeout
            ),
        }
    }
}
