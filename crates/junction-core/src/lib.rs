//! Junction core domain types
//!
//! Backend declarations and gateway configuration, shared by the gateway
//! crate and the CLI. No I/O beyond reading the configuration file.

pub mod backend;
pub mod config;

pub use backend::{BackendDeclaration, OAuthConfig, TransportKind, TransportSpec};
pub use config::{ConfigError, GatewayConfig, ListenSpec};
