//! Virtual MCP server
//!
//! Implements rmcp's `ServerHandler` over the capability routers, presenting
//! the union of all connected backends as one server.

mod handler;

pub use handler::GatewayHandler;
