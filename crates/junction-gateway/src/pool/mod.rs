//! Backend client pool
//!
//! Turns a list of backend declarations into live, name-tagged MCP client
//! sessions. Connects fan out concurrently and join; a backend that fails to
//! connect is logged and omitted so one dead backend cannot take the gateway
//! down with it.

pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rmcp::service::Peer;
use rmcp::RoleClient;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use junction_core::BackendDeclaration;

use crate::oauth::OAuthManager;

pub use transport::{
    GatewayClientHandler, HttpTransport, McpClient, SseTransport, StdioTransport, Transport,
    TransportFactory,
};

/// Pool-wide connection settings.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Per-backend connect budget.
    pub connect_timeout: Duration,
    /// Per-backend teardown budget before the transport is dropped outright.
    pub shutdown_grace: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// A live session with one backend, tagged with its declared name.
///
/// Owned by the gateway for its whole lifetime and torn down once, on gateway
/// shutdown. Requests go through the cloned peer; the running service handle
/// is held only so `close` can cancel it.
pub struct ConnectedClient {
    pub name: String,
    peer: Peer<RoleClient>,
    running: Mutex<Option<McpClient>>,
    shutdown_grace: Duration,
}

impl ConnectedClient {
    fn new(name: String, service: McpClient, shutdown_grace: Duration) -> Self {
        Self {
            name,
            peer: service.peer().clone(),
            running: Mutex::new(Some(service)),
            shutdown_grace,
        }
    }

    pub fn peer(&self) -> &Peer<RoleClient> {
        &self.peer
    }

    /// Tear the session down, bounded by the grace period.
    ///
    /// Graceful cancellation first; if that stalls, the service handle is
    /// dropped, which closes the transport and kills a child process
    /// (spawned with kill-on-drop). Safe to call more than once.
    pub async fn close(&self) {
        let service = self.running.lock().await.take();
        let Some(service) = service else {
            return;
        };
        match tokio::time::timeout(self.shutdown_grace, service.cancel()).await {
            Ok(Ok(_)) => debug!(backend = %self.name, "backend session closed"),
            Ok(Err(e)) => warn!(backend = %self.name, error = %e, "backend session close reported an error"),
            Err(_) => warn!(
                backend = %self.name,
                grace = ?self.shutdown_grace,
                "backend session did not close within the grace period, dropping transport"
            ),
        }
    }
}

/// Connect to every declared backend concurrently.
///
/// Returns only the successfully connected subset, in declaration order.
/// Never fails as a whole: a failed backend is logged and omitted.
pub async fn connect_all(
    backends: &[BackendDeclaration],
    config: &PoolConfig,
    oauth: Arc<OAuthManager>,
) -> Vec<Arc<ConnectedClient>> {
    let mut tasks = JoinSet::new();
    for (index, backend) in backends.iter().enumerate() {
        let transport = TransportFactory::create(backend, config.connect_timeout, oauth.clone());
        let name = backend.name.clone();
        let description = transport.description();
        let grace = config.shutdown_grace;
        tasks.spawn(async move {
            match transport.connect().await {
                Ok(service) => Some((index, ConnectedClient::new(name, service, grace))),
                Err(err) => {
                    warn!(
                        backend = %name,
                        transport = %description,
                        error = %err,
                        "backend connection failed, omitting from active set"
                    );
                    None
                }
            }
        });
    }

    let mut connected = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Some(entry)) => connected.push(entry),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "backend connect task failed to join"),
        }
    }
    connected.sort_by_key(|(index, _)| *index);

    info!(
        connected = connected.len(),
        declared = backends.len(),
        "backend pool ready"
    );

    connected
        .into_iter()
        .map(|(_, client)| Arc::new(client))
        .collect()
}

/// Best-effort teardown of every client, run concurrently so the total wall
/// time stays near one grace period rather than the sum.
pub async fn close_all(clients: &[Arc<ConnectedClient>]) {
    join_all(clients.iter().map(|client| client.close())).await;
}
