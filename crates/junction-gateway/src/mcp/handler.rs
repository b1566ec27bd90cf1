//! Gateway MCP handler
//!
//! Registers the four capability routers as the aggregate server's request
//! handlers. List responses carry `[backend]`-labeled items; invoke requests
//! are forwarded verbatim to the owning backend, whose application errors
//! pass through untouched.

use std::sync::Arc;

use futures::future::join_all;
use rmcp::{
    model::{
        CallToolRequestParams, CallToolResult, GetPromptRequestParams, GetPromptResult,
        Implementation, ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult,
        ListToolsResult, PaginatedRequestParams, PromptsCapability, ReadResourceRequestParams,
        ReadResourceResult, ResourcesCapability, ServerCapabilities, ServerInfo, ToolsCapability,
    },
    service::RequestContext,
    ErrorData as McpError, RoleServer, ServerHandler,
};

use crate::pool::ConnectedClient;
use crate::routing::{PromptRouter, ResourceRouter, ResourceTemplateRouter, ToolRouter};

/// The aggregate virtual server.
#[derive(Clone)]
pub struct GatewayHandler {
    clients: Arc<Vec<Arc<ConnectedClient>>>,
    tools: Arc<ToolRouter>,
    prompts: Arc<PromptRouter>,
    resources: Arc<ResourceRouter>,
    templates: Arc<ResourceTemplateRouter>,
}

impl GatewayHandler {
    pub fn new(clients: Vec<Arc<ConnectedClient>>) -> Self {
        let clients = Arc::new(clients);
        Self {
            tools: Arc::new(ToolRouter::new(clients.clone())),
            prompts: Arc::new(PromptRouter::new(clients.clone())),
            resources: Arc::new(ResourceRouter::new(clients.clone())),
            templates: Arc::new(ResourceTemplateRouter::new(clients.clone())),
            clients,
        }
    }

    pub fn clients(&self) -> &[Arc<ConnectedClient>] {
        &self.clients
    }

    /// Best-effort teardown of every backend session. Individual failures are
    /// logged by the sessions themselves; none aborts the others.
    pub async fn shutdown(&self) {
        join_all(self.clients.iter().map(|client| client.close())).await;
    }
}

impl ServerHandler for GatewayHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: Default::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools_with(ToolsCapability {
                    list_changed: Some(false),
                })
                .enable_prompts_with(PromptsCapability {
                    list_changed: Some(false),
                })
                .enable_resources_with(ResourcesCapability {
                    subscribe: Some(false),
                    list_changed: Some(false),
                })
                .build(),
            server_info: Implementation {
                name: "junction".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Junction aggregates multiple MCP servers. Capability descriptions are \
                 prefixed with the owning backend's name in square brackets."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(self.tools.list(params).await)
    }

    async fn call_tool(
        &self,
        params: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.tools
            .call(params)
            .await
            .map_err(|e| e.into_error_data())
    }

    async fn list_prompts(
        &self,
        params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, McpError> {
        Ok(self.prompts.list(params).await)
    }

    async fn get_prompt(
        &self,
        params: GetPromptRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, McpError> {
        self.prompts
            .get(params)
            .await
            .map_err(|e| e.into_error_data())
    }

    async fn list_resources(
        &self,
        params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(self.resources.list(params).await)
    }

    async fn read_resource(
        &self,
        params: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.resources
            .read(params)
            .await
            .map_err(|e| e.into_error_data())
    }

    async fn list_resource_templates(
        &self,
        params: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        Ok(self.templates.list(params).await)
    }
}
