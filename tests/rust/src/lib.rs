//! Shared test utilities for Junction integration tests.


pub use backends::{spawn_backend, TestBackend};

/// Helpers for driving the gateway from tests.
pub mod support {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use junction_core::{BackendDeclaration, TransportSpec};
    use junction_gateway::oauth::AuthorizationHandler;
    use junction_gateway::{connect_all, ConnectedClient, OAuthManager, PoolConfig};

    /// Declaration for a plain streamable HTTP backend.
    pub fn http_backend(name: &str, url: &str) -> BackendDeclaration {
        BackendDeclaration {
            name: name.to_string(),
            transport: TransportSpec::Http {
                url: url.to_string(),
                headers: HashMap::new(),
                oauth: None,
            },
        }
    }

    /// Authorization handler that must never be reached.
    pub struct NoAuthorization;

    #[async_trait]
    impl AuthorizationHandler for NoAuthorization {
        async fn authorize(&self, _: &str, _: &str, _: &str) -> anyhow::Result<String> {
            anyhow::bail!("interactive authorization was not expected in this test")
        }
    }

    pub fn oauth_manager() -> Arc<OAuthManager> {
        Arc::new(OAuthManager::new(
            "http://127.0.0.1:0".to_string(),
            Arc::new(NoAuthorization),
        ))
    }

    pub fn pool_config() -> PoolConfig {
        PoolConfig {
            connect_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(2),
        }
    }

    /// Connect the declared backends with test-sized timeouts.
    pub async fn connect_pool(backends: &[BackendDeclaration]) -> Vec<Arc<ConnectedClient>> {
        connect_all(backends, &pool_config(), oauth_manager()).await
    }

    /// Build request params from their wire shape, so tests stay independent
    /// of struct-field churn in the protocol types.
    pub fn params<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
        serde_json::from_value(value).expect("valid request params")
    }

    /// First text block of a tool call result.
    pub fn result_text(result: &rmcp::model::CallToolResult) -> String {
        let value = serde_json::to_value(result).expect("serializable result");
        value["content"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string()
    }
}
