//! Outward-facing gateway server
//!
//! Serves the aggregate handler to the downstream caller over one of three
//! transports: the process's own stdio, legacy SSE (`GET /sse` with a
//! `POST /message` companion endpoint), or streamable HTTP on `/mcp` with a
//! `/healthz` route alongside. Failing to bind the listener is fatal; the
//! process aborts during startup rather than limping along unreachable.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::{response::Json, routing::get, Router};
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::ServiceExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use junction_core::ListenSpec;

use crate::mcp::GatewayHandler;

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Serves one [`GatewayHandler`] until the cancellation token fires.
pub struct GatewayServer {
    handler: GatewayHandler,
}

impl GatewayServer {
    pub fn new(handler: GatewayHandler) -> Self {
        Self { handler }
    }

    /// Serve on the transport the configuration selected.
    pub async fn serve(self, listen: &ListenSpec, ct: CancellationToken) -> anyhow::Result<()> {
        match listen {
            ListenSpec::Stdio => self.serve_stdio(ct).await,
            ListenSpec::Sse { bind } => {
                let addr = parse_bind(bind)?;
                self.serve_sse(addr, ct).await
            }
            ListenSpec::Http { bind } => {
                let addr = parse_bind(bind)?;
                self.serve_http(addr, ct).await
            }
        }
    }

    /// Serve MCP over the gateway process's own stdin/stdout.
    pub async fn serve_stdio(self, ct: CancellationToken) -> anyhow::Result<()> {
        info!("gateway serving on stdio");
        let service = self
            .handler
            .serve(rmcp::transport::stdio())
            .await
            .context("stdio handshake with caller failed")?;

        let mut waiting = tokio::spawn(service.waiting());
        tokio::select! {
            _ = ct.cancelled() => {
                info!("shutdown requested, closing stdio server");
                waiting.abort();
            }
            joined = &mut waiting => {
                match joined {
                    Ok(Ok(reason)) => info!(?reason, "stdio caller disconnected"),
                    Ok(Err(e)) => info!(error = %e, "stdio server ended"),
                    Err(e) => info!(error = %e, "stdio server task ended"),
                }
            }
        }
        Ok(())
    }

    /// Serve MCP over legacy SSE: `GET /sse` opens the event stream and
    /// advertises the `POST /message` endpoint; keep-alives guard callers
    /// that time out on an empty first byte.
    pub async fn serve_sse(self, bind: SocketAddr, ct: CancellationToken) -> anyhow::Result<()> {
        let config = SseServerConfig {
            bind,
            sse_path: "/sse".to_string(),
            post_path: "/message".to_string(),
            ct: ct.child_token(),
            sse_keep_alive: Some(SSE_KEEP_ALIVE),
        };
        let (sse_server, router) = SseServer::new(config);

        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .with_context(|| format!("failed to bind SSE listener on {bind}"))?;

        let handler = self.handler;
        let service_ct = sse_server.with_service(move || handler.clone());

        info!(bind = %bind, "gateway serving SSE on /sse");

        let shutdown_ct = ct.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown_ct.cancelled().await })
            .await
            .context("SSE server failed")?;

        service_ct.cancel();
        Ok(())
    }

    /// Serve MCP over streamable HTTP on `/mcp`.
    pub async fn serve_http(self, bind: SocketAddr, ct: CancellationToken) -> anyhow::Result<()> {
        let handler = self.handler;
        let mcp_service = StreamableHttpService::new(
            move || Ok(handler.clone()),
            LocalSessionManager::default().into(),
            StreamableHttpServerConfig {
                stateful_mode: true,
                sse_keep_alive: Some(SSE_KEEP_ALIVE),
                sse_retry: Some(Duration::from_secs(3)),
                cancellation_token: ct.child_token(),
            },
        );

        let router = Router::new()
            .route("/healthz", get(healthz))
            .nest_service("/mcp", mcp_service)
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );

        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .with_context(|| format!("failed to bind gateway listener on {bind}"))?;

        info!(bind = %bind, "gateway serving streamable HTTP on /mcp");

        let shutdown_ct = ct.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown_ct.cancelled().await })
            .await
            .context("HTTP server failed")?;

        Ok(())
    }
}

fn parse_bind(bind: &str) -> anyhow::Result<SocketAddr> {
    bind.parse()
        .with_context(|| format!("invalid bind address '{bind}'"))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
