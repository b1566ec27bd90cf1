//! Junction Gateway
//!
//! Aggregating MCP proxy that provides:
//! - Client connections to backends over stdio, SSE, and streamable HTTP
//! - OAuth 2.1 authorization toward protected backends
//! - Capability aggregation and request routing back to the owning backend
//! - A single virtual MCP server served over stdio, SSE, or streamable HTTP

pub mod error;
pub mod mcp;
pub mod oauth;
pub mod pool;
pub mod routing;
pub mod server;

pub use error::{ConnectError, RouteError};
pub use mcp::GatewayHandler;
pub use oauth::{
    AuthorizationHandler, BrowserAuthorizer, OAuthManager, PendingAuthorizations,
    backend_key, backend_url,
};
pub use pool::{
    close_all, connect_all, ConnectedClient, PoolConfig, Transport, TransportFactory,
};
pub use routing::{
    PromptRouter, ResourceRouter, ResourceTemplateRouter, RoutingTable, ToolRouter,
};
pub use server::GatewayServer;
