//! OAuth 2.1 authorization code flow with PKCE

use std::collections::HashMap;

use tracing::{debug, info};
use url::Url;

use super::discovery::OAuthMetadata;
use super::pkce::PkceChallenge;
use super::token::{OAuthToken, TokenResponse};

/// Authorization request handed to the operator (opened in a browser).
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Full authorization URL to open.
    pub authorization_url: String,
    /// State parameter for CSRF protection.
    pub state: String,
    /// PKCE verifier, used in the token exchange.
    pub pkce_verifier: String,
}

/// One authorization code flow against a backend's authorization server.
pub struct OAuthFlow {
    metadata: OAuthMetadata,
    client_id: String,
    client_secret: Option<String>,
}

impl OAuthFlow {
    pub fn new(metadata: OAuthMetadata, client_id: String, client_secret: Option<String>) -> Self {
        Self {
            metadata,
            client_id,
            client_secret,
        }
    }

    /// Build the authorization URL with state and PKCE parameters.
    pub fn create_authorization_request(
        &self,
        redirect_uri: &str,
        scopes: &[String],
    ) -> anyhow::Result<AuthorizationRequest> {
        let state = generate_state();
        let pkce = PkceChallenge::generate();

        let mut url = Url::parse(&self.metadata.authorization_endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", &self.client_id);
            query.append_pair("redirect_uri", redirect_uri);
            if !scopes.is_empty() {
                query.append_pair("scope", &scopes.join(" "));
            }
            query.append_pair("state", &state);
            query.append_pair("code_challenge", &pkce.challenge);
            query.append_pair("code_challenge_method", &pkce.method);
        }

        debug!(url = %url, "built authorization URL");

        Ok(AuthorizationRequest {
            authorization_url: url.to_string(),
            state,
            pkce_verifier: pkce.verifier,
        })
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        http_client: &reqwest::Client,
        code: &str,
        redirect_uri: &str,
        pkce_verifier: &str,
    ) -> anyhow::Result<OAuthToken> {
        let mut params = HashMap::new();
        params.insert("grant_type", "authorization_code");
        params.insert("code", code);
        params.insert("redirect_uri", redirect_uri);
        params.insert("client_id", &self.client_id);
        params.insert("code_verifier", pkce_verifier);

        let client_secret;
        if let Some(secret) = &self.client_secret {
            client_secret = secret.clone();
            params.insert("client_secret", &client_secret);
        }

        let response = http_client
            .post(&self.metadata.token_endpoint)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("token exchange failed: HTTP {} - {}", status, body);
        }

        let token_response: TokenResponse = response.json().await?;
        info!("token exchange successful");

        Ok(token_response.into())
    }
}

/// Random URL-safe state parameter.
fn generate_state() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}
