//! Prompt aggregation and get routing

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::{
    GetPromptRequestParams, GetPromptResult, ListPromptsResult, PaginatedRequestParams,
};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::RouteError;
use crate::pool::ConnectedClient;

use super::table::RoutingTable;
use super::{labeled, LIST_TIMEOUT};

/// Aggregates `prompts/list` and routes `prompts/get`.
pub struct PromptRouter {
    clients: Arc<Vec<Arc<ConnectedClient>>>,
    table: RoutingTable,
}

impl PromptRouter {
    pub fn new(clients: Arc<Vec<Arc<ConnectedClient>>>) -> Self {
        Self {
            clients,
            table: RoutingTable::new(),
        }
    }

    pub async fn list(&self, params: Option<PaginatedRequestParams>) -> ListPromptsResult {
        let mut tasks = JoinSet::new();
        for (index, client) in self.clients.iter().enumerate() {
            let peer = client.peer().clone();
            let params = params.clone();
            tasks.spawn(async move {
                let outcome =
                    match tokio::time::timeout(LIST_TIMEOUT, peer.list_prompts(params)).await {
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
                Err(err) => warn!(error = %err, "prompts/list task failed to join"),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let mut entries = HashMap::new();
        let mut prompts = Vec::new();
        let mut next_cursor = None;
        for (index, outcome) in outcomes {
            let client = &self.clients[index];
            match outcome {
                Ok(listing) => {
                    for mut prompt in listing.prompts {
                        prompt.description =
                            Some(labeled(&client.name, prompt.description.as_deref()));
                        entries.insert(prompt.name.clone(), client.clone());
                        prompts.push(prompt);
                    }
                    if listing.next_cursor.is_some() {
                        next_cursor = listing.next_cursor;
                    }
                }
                Err(err) => {
                    warn!(backend = %client.name, error = %err, "prompts/list failed, skipping backend");
                }
            }
        }

        self.table.replace(entries);
        debug!(count = prompts.len(), "aggregated prompts/list");

        let mut result = ListPromptsResult::with_all_items(prompts);
        result.next_cursor = next_cursor;
        result
    }

    pub async fn get(&self, params: GetPromptRequestParams) -> Result<GetPromptResult, RouteError> {
        let client = self
            .table
            .lookup(&params.name)
            .ok_or_else(|| RouteError::UnknownCapability {
                kind: "prompt",
                identifier: params.name.clone(),
            })?;

        info!(prompt = %params.name, backend = %client.name, "routing prompts/get");

        client
            .peer()
            .get_prompt(params)
            .await
            .map_err(|e| RouteError::from_service_error(&client.name, e))
    }
}
