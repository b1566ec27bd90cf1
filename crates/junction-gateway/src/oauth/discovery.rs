//! Authorization server metadata discovery (RFC 8414)
//!
//! Fetches `.well-known` metadata from a backend's authorization server.
//! Servers that publish neither the OAuth nor the OIDC document get the
//! spec-default endpoint paths derived from the issuer.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Authorization server metadata. Only the fields the gateway consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthMetadata {
    #[serde(default)]
    pub issuer: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub registration_endpoint: Option<String>,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    #[serde(default)]
    pub code_challenge_methods_supported: Vec<String>,
}

impl OAuthMetadata {
    /// Fallback endpoints when the server publishes no metadata document.
    pub fn defaults_for(issuer: &str) -> Self {
        let base = issuer.trim_end_matches('/');
        Self {
            issuer: Some(base.to_string()),
            authorization_endpoint: format!("{base}/authorize"),
            token_endpoint: format!("{base}/token"),
            registration_endpoint: None,
            scopes_supported: Vec::new(),
            code_challenge_methods_supported: vec!["S256".to_string()],
        }
    }
}

/// Metadata discovery client.
pub struct OAuthDiscovery {
    http_client: reqwest::Client,
}

impl OAuthDiscovery {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Fetch metadata for an issuer, trying the OAuth document first, then
    /// the OIDC document, then falling back to default endpoint paths.
    pub async fn fetch(&self, issuer: &str) -> anyhow::Result<OAuthMetadata> {
        let base = issuer.trim_end_matches('/');
        for path in [
            "/.well-known/oauth-authorization-server",
            "/.well-known/openid-configuration",
        ] {
            let url = format!("{base}{path}");
            match self.try_fetch(&url).await {
                Ok(metadata) => {
                    debug!(url = %url, "discovered authorization server metadata");
                    return Ok(metadata);
                }
                Err(e) => {
                    debug!(url = %url, error = %e, "metadata document unavailable");
                }
            }
        }
        debug!(issuer = %issuer, "no metadata document, using default endpoints");
        Ok(OAuthMetadata::defaults_for(issuer))
    }

    async fn try_fetch(&self, url: &str) -> anyhow::Result<OAuthMetadata> {
        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("HTTP {}", response.status());
        }
        Ok(response.json().await?)
    }
}
