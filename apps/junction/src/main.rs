//! Junction CLI
//!
//! Loads the gateway configuration, connects the backend pool, and serves the
//! aggregate MCP server until a termination signal arrives. Cleanup runs
//! exactly once, after the serve loop returns.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use junction_core::GatewayConfig;
use junction_gateway::{
    close_all, connect_all, oauth, BrowserAuthorizer, GatewayHandler, GatewayServer, OAuthManager,
    PendingAuthorizations, PoolConfig,
};

/// How long an interactive authorization may sit in the operator's browser.
const AUTHORIZATION_WAIT: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "junction", version, about = "Aggregating MCP gateway")]
struct Cli {
    /// Path to the gateway configuration file
    #[arg(short, long, default_value = "junction.json")]
    config: PathBuf,

    /// Log filter, e.g. "info" or "junction_gateway=debug"
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr: stdout may be the MCP transport itself.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = GatewayConfig::load(&cli.config)
        .with_context(|| format!("cannot start without a valid config ({})", cli.config.display()))?;
    info!(
        backends = config.backends.len(),
        listen = ?config.listen,
        "configuration loaded"
    );

    let ct = CancellationToken::new();

    // Callback listener only runs while OAuth-capable backends are declared.
    let pending = Arc::new(PendingAuthorizations::new());
    if config.needs_oauth_callbacks() {
        let addr = config.oauth_callback_addr()?;
        let pending = pending.clone();
        let callback_ct = ct.child_token();
        tokio::spawn(async move {
            if let Err(e) = oauth::serve_callbacks(addr, pending, callback_ct).await {
                warn!(error = %e, "OAuth callback listener stopped");
            }
        });
    }

    let authorizer = Arc::new(BrowserAuthorizer::new(pending, AUTHORIZATION_WAIT));
    let oauth_manager = Arc::new(OAuthManager::new(
        config.oauth_callback_base(),
        authorizer,
    ));

    let pool_config = PoolConfig {
        connect_timeout: config.connect_timeout(),
        shutdown_grace: config.shutdown_grace(),
    };
    let clients = connect_all(&config.backends, &pool_config, oauth_manager).await;
    if clients.is_empty() {
        warn!("no backends connected; serving an empty capability set");
    }

    let handler = GatewayHandler::new(clients.clone());

    // First ctrl-c triggers graceful shutdown.
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("termination signal received");
            signal_ct.cancel();
        }
    });

    let result = GatewayServer::new(handler).serve(&config.listen, ct.clone()).await;

    ct.cancel();
    info!("closing backend sessions");
    close_all(&clients).await;

    result
}
