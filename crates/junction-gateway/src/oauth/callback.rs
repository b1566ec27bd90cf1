//! OAuth callback endpoint
//!
//! `GET /oauth/{backend_key}/callback` on a locally bound listener receives
//! the redirect from the authorization server and hands the outcome to the
//! pending connect attempt. A repeat callback for an already-resolved key is
//! answered with the success page and has no further effect.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::pending::{backend_url, PendingAuthorizations};

const SUCCESS_PAGE: &str = "<!DOCTYPE html>\n<html>\n<head><title>Junction</title></head>\n<body>\n<h1>Authorization complete</h1>\n<p>You can close this window and return to the gateway.</p>\n</body>\n</html>\n";

/// Query parameters of the authorization redirect.
#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Router serving the callback route against a shared pending-attempt map.
pub fn callback_router(pending: Arc<PendingAuthorizations>) -> Router {
    Router::new()
        .route("/oauth/{backend_key}/callback", get(oauth_callback))
        .with_state(pending)
}

/// Bind and serve the callback listener until `ct` is cancelled.
pub async fn serve_callbacks(
    bind: SocketAddr,
    pending: Arc<PendingAuthorizations>,
    ct: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind OAuth callback listener on {bind}"))?;
    info!(bind = %bind, "OAuth callback listener ready");

    axum::serve(listener, callback_router(pending))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .context("OAuth callback listener failed")
}

async fn oauth_callback(
    Path(backend_key): Path<String>,
    Query(params): Query<CallbackParams>,
    State(pending): State<Arc<PendingAuthorizations>>,
) -> Response {
    let backend = match backend_url(&backend_key) {
        Ok(url) => url,
        Err(e) => {
            warn!(key = %backend_key, error = %e, "callback with undecodable backend key");
            return (
                StatusCode::BAD_REQUEST,
                format!("unrecognized backend key '{backend_key}'"),
            )
                .into_response();
        }
    };

    if let Some(error) = params.error {
        let message = match params.error_description {
            Some(desc) => format!("{error}: {desc}"),
            None => error,
        };
        warn!(backend = %backend, error = %message, "authorization rejected");
        pending.reject(&backend_key, message.clone());
        return (
            StatusCode::BAD_REQUEST,
            format!("authorization failed for {backend}: {message}"),
        )
            .into_response();
    }

    if let Some(code) = params.code {
        if pending.resolve(&backend_key, code) {
            info!(backend = %backend, "authorization code delivered");
        } else {
            // Already resolved, or the attempt went away. Idempotent response.
            info!(backend = %backend, "duplicate or unmatched callback, ignoring");
        }
        return Html(SUCCESS_PAGE).into_response();
    }

    warn!(backend = %backend, "callback carried neither code nor error");
    pending.reject(
        &backend_key,
        "authorization callback carried neither code nor error".to_string(),
    );
    (
        StatusCode::BAD_REQUEST,
        "callback must include a 'code' or 'error' parameter".to_string(),
    )
        .into_response()
}
