//! OAuth flow behavior
//!
//! The callback endpoint against a real listener, the token exchange against
//! a mocked authorization server, and the one-handshake-per-connect-attempt
//! rule for OAuth-protected backends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use junction_core::{BackendDeclaration, OAuthConfig, TransportSpec};
use junction_gateway::oauth::{
    backend_key, callback_router, AuthorizationHandler, OAuthFlow, OAuthManager, OAuthMetadata,
    PendingAuthorizations,
};
use junction_gateway::{ConnectError, Transport, TransportFactory};

/// Serve the callback router on an ephemeral port.
async fn spawn_callback_listener(
    pending: Arc<PendingAuthorizations>,
) -> (String, CancellationToken) {
    let ct = CancellationToken::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind callback listener");
    let base = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

    let serve_ct = ct.clone();
    tokio::spawn(async move {
        axum::serve(listener, callback_router(pending))
            .with_graceful_shutdown(async move { serve_ct.cancelled().await })
            .await
            .expect("callback listener");
    });

    (base, ct)
}

#[tokio::test]
async fn callback_with_code_resolves_the_pending_attempt() {
    let pending = Arc::new(PendingAuthorizations::new());
    let (base, ct) = spawn_callback_listener(pending.clone()).await;

    let key = backend_key("https://issues.example.com/mcp");
    let rx = pending.register(&key);

    let response = reqwest::get(format!("{base}/oauth/{key}/callback?code=code-123&state=s"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.text().await.unwrap().contains("Authorization complete"));

    assert_eq!(rx.await.unwrap(), Ok("code-123".to_string()));
    assert!(pending.is_empty());

    ct.cancel();
}

#[tokio::test]
async fn callback_with_error_rejects_the_pending_attempt() {
    let pending = Arc::new(PendingAuthorizations::new());
    let (base, ct) = spawn_callback_listener(pending.clone()).await;

    let key = backend_key("https://issues.example.com/mcp");
    let rx = pending.register(&key);

    let response = reqwest::get(format!(
        "{base}/oauth/{key}/callback?error=access_denied&error_description=nope"
    ))
    .await
    .unwrap();
    assert_eq!(response.status(), 400);

    assert_eq!(rx.await.unwrap(), Err("access_denied: nope".to_string()));

    ct.cancel();
}

#[tokio::test]
async fn callback_without_code_or_error_is_a_protocol_violation() {
    let pending = Arc::new(PendingAuthorizations::new());
    let (base, ct) = spawn_callback_listener(pending.clone()).await;

    let key = backend_key("https://issues.example.com/mcp");
    let rx = pending.register(&key);

    let response = reqwest::get(format!("{base}/oauth/{key}/callback"))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    // The waiting connect attempt fails cleanly instead of hanging.
    assert!(rx.await.unwrap().is_err());

    ct.cancel();
}

#[tokio::test]
async fn duplicate_callback_is_an_idempotent_success() {
    let pending = Arc::new(PendingAuthorizations::new());
    let (base, ct) = spawn_callback_listener(pending.clone()).await;

    let key = backend_key("https://issues.example.com/mcp");
    let rx = pending.register(&key);

    let url = format!("{base}/oauth/{key}/callback?code=code-123");
    assert_eq!(reqwest::get(&url).await.unwrap().status(), 200);
    assert_eq!(rx.await.unwrap(), Ok("code-123".to_string()));

    // Replay of the redirect: success page again, no pending state touched.
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(pending.is_empty());

    ct.cancel();
}

#[tokio::test]
async fn code_exchange_posts_the_pkce_verifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=code-123"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-456",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let flow = OAuthFlow::new(
        OAuthMetadata::defaults_for(&server.uri()),
        "junction".to_string(),
        None,
    );
    let request = flow
        .create_authorization_request("http://127.0.0.1:1/oauth/x/callback", &[])
        .unwrap();

    let token = flow
        .exchange_code(
            &reqwest::Client::new(),
            "code-123",
            "http://127.0.0.1:1/oauth/x/callback",
            &request.pkce_verifier,
        )
        .await
        .unwrap();

    assert_eq!(token.access_token, "tok-456");
    assert_eq!(token.authorization_header(), "Bearer tok-456");
}

/// Counts handshakes and hands back a fixed code.
struct CountingAuthorizer {
    calls: AtomicUsize,
}

#[async_trait]
impl AuthorizationHandler for CountingAuthorizer {
    async fn authorize(&self, _: &str, _: &str, url: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // The authorization URL must point at the declared issuer.
        assert!(url.contains("response_type=code"));
        Ok("code-123".to_string())
    }
}

#[tokio::test]
async fn authorization_runs_exactly_once_per_connect_attempt() {
    // The backend never accepts the handshake: every POST is a 401. The
    // connector must run the OAuth flow once, retry once with the token, and
    // then give up instead of looping.
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(401)
                .insert_header("WWW-Authenticate", "Bearer resource_metadata=\"none\"")
                .set_body_string("401 Unauthorized"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/.well-known/oauth-authorization-server"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": server.uri(),
            "authorization_endpoint": format!("{}/authorize", server.uri()),
            "token_endpoint": format!("{}/token", server.uri()),
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-456",
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let authorizer = Arc::new(CountingAuthorizer {
        calls: AtomicUsize::new(0),
    });
    let oauth = Arc::new(OAuthManager::new(
        "http://127.0.0.1:1".to_string(),
        authorizer.clone(),
    ));

    let backend = BackendDeclaration {
        name: "locked".to_string(),
        transport: TransportSpec::Http {
            url: format!("{}/mcp", server.uri()),
            headers: HashMap::new(),
            oauth: Some(OAuthConfig {
                issuer: Some(server.uri()),
                scopes: vec!["mcp".to_string()],
                client_id: Some("junction".to_string()),
                client_secret: None,
            }),
        },
    };

    let transport = TransportFactory::create(&backend, Duration::from_secs(10), oauth);
    match transport.connect().await {
        Err(ConnectError::Authorization(message)) => {
            assert!(
                message.contains("still requires authorization"),
                "unexpected message: {message}"
            );
        }
        Err(other) => panic!("expected Authorization error, got {other}"),
        Ok(_) => panic!("connect unexpectedly succeeded"),
    }

    assert_eq!(authorizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn declared_authorization_header_disables_the_oauth_flow() {
    // Backend rejects the PAT; the connector must fail without ever invoking
    // the interactive flow.
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(401).set_body_string("401 Unauthorized"))
        .mount(&server)
        .await;

    let authorizer = Arc::new(CountingAuthorizer {
        calls: AtomicUsize::new(0),
    });
    let oauth = Arc::new(OAuthManager::new(
        "http://127.0.0.1:1".to_string(),
        authorizer.clone(),
    ));

    let mut headers = HashMap::new();
    headers.insert("Authorization".to_string(), "Bearer pat_xxx".to_string());
    let backend = BackendDeclaration {
        name: "locked".to_string(),
        transport: TransportSpec::Http {
            url: format!("{}/mcp", server.uri()),
            headers,
            oauth: Some(OAuthConfig {
                issuer: Some(server.uri()),
                scopes: vec![],
                client_id: Some("junction".to_string()),
                client_secret: None,
            }),
        },
    };

    let transport = TransportFactory::create(&backend, Duration::from_secs(10), oauth);
    match transport.connect().await {
        Err(ConnectError::Authorization(message)) => {
            assert!(message.contains("rejected the declared Authorization header"));
        }
        Err(other) => panic!("expected Authorization error, got {other}"),
        Ok(_) => panic!("connect unexpectedly succeeded"),
    }

    assert_eq!(authorizer.calls.load(Ordering::SeqCst), 0);
}
