//! Tool aggregation and call routing

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::{CallToolRequestParams, CallToolResult, ListToolsResult, PaginatedRequestParams};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::RouteError;
use crate::pool::ConnectedClient;

use super::table::RoutingTable;
use super::{labeled, LIST_TIMEOUT};

/// Aggregates `tools/list` and routes `tools/call`.
pub struct ToolRouter {
    clients: Arc<Vec<Arc<ConnectedClient>>>,
    table: RoutingTable,
}

impl ToolRouter {
    pub fn new(clients: Arc<Vec<Arc<ConnectedClient>>>) -> Self {
        Self {
            clients,
            table: RoutingTable::new(),
        }
    }

    /// Fan the list out to every backend, merge the survivors, and rebuild
    /// the routing table from exactly this call's results.
    pub async fn list(&self, params: Option<PaginatedRequestParams>) -> ListToolsResult {
        let mut tasks = JoinSet::new();
        for (index, client) in self.clients.iter().enumerate() {
            let peer = client.peer().clone();
            let params = params.clone();
            tasks.spawn(async move {
                let outcome = match tokio::time::timeout(LIST_TIMEOUT, peer.list_tools(params)).await
                {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(_) => Err(format!("timed out after {LIST_TIMEOUT:?}")),
                };
                (index, outcome)
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => outcomes.push(entry),
                Err(err) => warn!(error = %err, "tools/list task failed to join"),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let mut entries = HashMap::new();
        let mut tools = Vec::new();
        let mut next_cursor = None;
        for (index, outcome) in outcomes {
            let client = &self.clients[index];
            match outcome {
                Ok(listing) => {
                    for mut tool in listing.tools {
                        tool.description =
                            Some(labeled(&client.name, tool.description.as_deref()).into());
                        entries.insert(tool.name.to_string(), client.clone());
                        tools.push(tool);
                    }
                    if listing.next_cursor.is_some() {
                        next_cursor = listing.next_cursor;
                    }
                }
                Err(err) => {
                    warn!(backend = %client.name, error = %err, "tools/list failed, skipping backend");
                }
            }
        }

        self.table.replace(entries);
        debug!(count = tools.len(), "aggregated tools/list");

        let mut result = ListToolsResult::with_all_items(tools);
        result.next_cursor = next_cursor;
        result
    }

    /// Route a call to the backend that owns the tool, forwarding the request
    /// untouched and returning its response or error unchanged.
    pub async fn call(&self, params: CallToolRequestParams) -> Result<CallToolResult, RouteError> {
        let client =
            self.table
                .lookup(params.name.as_ref())
                .ok_or_else(|| RouteError::UnknownCapability {
                    kind: "tool",
                    identifier: params.name.to_string(),
                })?;

        info!(tool = %params.name, backend = %client.name, "routing tools/call");

        client
            .peer()
            .call_tool(params)
            .await
            .map_err(|e| RouteError::from_service_error(&client.name, e))
    }
}
