//! Gateway lifecycle
//!
//! End-to-end flow through the outward streamable HTTP transport, plus
//! teardown behavior: bounded close and close idempotence.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::ServiceExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use junction_gateway::{close_all, GatewayHandler};
use tests::support::{connect_pool, http_backend, params, result_text};
use tests::{spawn_backend, TestBackend};

/// Serve a gateway handler over streamable HTTP on an ephemeral port.
async fn spawn_gateway(handler: GatewayHandler) -> (String, CancellationToken) {
    let ct = CancellationToken::new();
    let service = StreamableHttpService::new(
        move || Ok(handler.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            stateful_mode: true,
            sse_keep_alive: Some(Duration::from_secs(15)),
            sse_retry: Some(Duration::from_secs(3)),
            cancellation_token: ct.child_token(),
        },
    );
    let router = axum::Router::new().nest_service("/mcp", service);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind gateway");
    let url = format!("http://127.0.0.1:{}/mcp", listener.local_addr().unwrap().port());

    let serve_ct = ct.clone();
    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { serve_ct.cancelled().await })
            .await
            .expect("gateway server");
    });

    (url, ct)
}

#[tokio::test]
async fn caller_sees_the_union_through_the_http_transport() {
    let (url_a, ct_a) = spawn_backend(TestBackend::new("a").with_tool("echo", "Echo tool")).await;
    let (url_b, ct_b) =
        spawn_backend(TestBackend::new("b").with_tool("reverse", "Reverse tool")).await;

    let clients = connect_pool(&[http_backend("a", &url_a), http_backend("b", &url_b)]).await;
    assert_eq!(clients.len(), 2);

    let handler = GatewayHandler::new(clients.clone());
    let (gateway_url, gateway_ct) = spawn_gateway(handler.clone()).await;

    // A real downstream MCP client against the gateway.
    let caller = ()
        .serve(StreamableHttpClientTransport::from_uri(gateway_url))
        .await
        .expect("caller connects to gateway");

    let info = caller.peer_info();
    assert!(info.is_some_and(|i| i.server_info.name == "junction"));

    let listing = caller.peer().list_tools(None).await.unwrap();
    assert_eq!(listing.tools.len(), 2);
    let echo = listing
        .tools
        .iter()
        .find(|t| t.name.as_ref() == "echo")
        .expect("echo visible through gateway");
    assert_eq!(echo.description.as_deref(), Some("[a] Echo tool"));

    let result = caller
        .peer()
        .call_tool(params(json!({"name": "reverse"})))
        .await
        .unwrap();
    assert_eq!(result_text(&result), "b:reverse");

    caller.cancel().await.ok();
    gateway_ct.cancel();
    handler.shutdown().await;
    ct_a.cancel();
    ct_b.cancel();
}

#[tokio::test]
async fn unknown_tool_surfaces_an_explicit_error_to_the_caller() {
    let (url_a, ct_a) = spawn_backend(TestBackend::new("a").with_tool("echo", "Echo tool")).await;
    let clients = connect_pool(&[http_backend("a", &url_a)]).await;

    let handler = GatewayHandler::new(clients);
    let (gateway_url, gateway_ct) = spawn_gateway(handler.clone()).await;

    let caller = ()
        .serve(StreamableHttpClientTransport::from_uri(gateway_url))
        .await
        .expect("caller connects to gateway");

    caller.peer().list_tools(None).await.unwrap();
    let err = caller
        .peer()
        .call_tool(params(json!({"name": "never-listed"})))
        .await
        .expect_err("unknown tool must fail");
    match err {
        rmcp::ServiceError::McpError(data) => {
            assert!(data.message.contains("never-listed"), "got: {}", data.message)
        }
        other => panic!("expected an MCP protocol error, got {other:?}"),
    }

    caller.cancel().await.ok();
    gateway_ct.cancel();
    handler.shutdown().await;
    ct_a.cancel();
}

#[tokio::test]
async fn close_all_is_bounded_even_when_backends_are_gone() {
    let (url_a, ct_a) = spawn_backend(TestBackend::new("a").with_tool("echo", "Echo tool")).await;
    let (url_b, ct_b) =
        spawn_backend(TestBackend::new("b").with_tool("reverse", "Reverse tool")).await;

    let clients = connect_pool(&[http_backend("a", &url_a), http_backend("b", &url_b)]).await;
    assert_eq!(clients.len(), 2);

    // Backends vanish before teardown.
    ct_a.cancel();
    ct_b.cancel();

    let started = tokio::time::Instant::now();
    close_all(&clients).await;
    let elapsed = started.elapsed();

    // Grace is 2s per the test pool config; closes run concurrently, so the
    // whole teardown stays near one grace period.
    assert!(
        elapsed < Duration::from_secs(4),
        "teardown took {elapsed:?}, expected bounded time"
    );
}

#[tokio::test]
async fn close_is_idempotent() {
    let (url_a, ct_a) = spawn_backend(TestBackend::new("a").with_tool("echo", "Echo tool")).await;
    let clients = connect_pool(&[http_backend("a", &url_a)]).await;

    clients[0].close().await;
    clients[0].close().await;

    ct_a.cancel();
}
