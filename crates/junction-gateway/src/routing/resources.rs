//! Resource and resource-template aggregation
//!
//! Resources route reads by URI through a table like tools and prompts.
//! Resource templates are aggregation-only: they are never individually
//! addressed, so their router keeps no table.

use std::collections::HashMap;
use std::sync::Arc;

use rmcp::model::{
    ListResourceTemplatesResult, ListResourcesResult, PaginatedRequestParams,
    ReadResourceRequestParams, ReadResourceResult,
};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::RouteError;
use crate::pool::ConnectedClient;

use super::table::RoutingTable;
use super::{labeled, LIST_TIMEOUT};

/// Aggregates `resources/list` and routes `resources/read`.
pub struct ResourceRouter {
    clients: Arc<Vec<Arc<ConnectedClient>>>,
    table: RoutingTable,
}

impl ResourceRouter {
    pub fn new(clients: Arc<Vec<Arc<ConnectedClient>>>) -> Self {
        Self {
            clients,
            table: RoutingTable::new(),
        }
    }

    pub async fn list(&self, params: Option<PaginatedRequestParams>) -> ListResourcesResult {
        let mut tasks = JoinSet::new();
        for (index, client) in self.clients.iter().enumerate() {
            let peer = client.peer().clone();
            let params = params.clone();
            tasks.spawn(async move {
                let outcome =
                    match tokio::time::timeout(LIST_TIMEOUT, peer.list_resources(params)).await {
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
                Err(err) => warn!(error = %err, "resources/list task failed to join"),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let mut entries = HashMap::new();
        let mut resources = Vec::new();
        let mut next_cursor = None;
        for (index, outcome) in outcomes {
            let client = &self.clients[index];
            match outcome {
                Ok(listing) => {
                    for mut resource in listing.resources {
                        resource.raw.description =
                            Some(labeled(&client.name, resource.raw.description.as_deref()));
                        entries.insert(resource.raw.uri.clone(), client.clone());
                        resources.push(resource);
                    }
                    if listing.next_cursor.is_some() {
                        next_cursor = listing.next_cursor;
                    }
                }
                Err(err) => {
                    warn!(backend = %client.name, error = %err, "resources/list failed, skipping backend");
                }
            }
        }

        self.table.replace(entries);
        debug!(count = resources.len(), "aggregated resources/list");

        let mut result = ListResourcesResult::with_all_items(resources);
        result.next_cursor = next_cursor;
        result
    }

    pub async fn read(
        &self,
        params: ReadResourceRequestParams,
    ) -> Result<ReadResourceResult, RouteError> {
        let client = self
            .table
            .lookup(&params.uri)
            .ok_or_else(|| RouteError::UnknownCapability {
                kind: "resource",
                identifier: params.uri.clone(),
            })?;

        info!(uri = %params.uri, backend = %client.name, "routing resources/read");

        client
            .peer()
            .read_resource(params)
            .await
            .map_err(|e| RouteError::from_service_error(&client.name, e))
    }
}

/// Aggregates `resources/templates/list`. Pure fan-out, no lookup table.
pub struct ResourceTemplateRouter {
    clients: Arc<Vec<Arc<ConnectedClient>>>,
}

impl ResourceTemplateRouter {
    pub fn new(clients: Arc<Vec<Arc<ConnectedClient>>>) -> Self {
        Self { clients }
    }

    pub async fn list(
        &self,
        params: Option<PaginatedRequestParams>,
    ) -> ListResourceTemplatesResult {
        let mut tasks = JoinSet::new();
        for (index, client) in self.clients.iter().enumerate() {
            let peer = client.peer().clone();
            let params = params.clone();
            tasks.spawn(async move {
                let outcome = match tokio::time::timeout(
                    LIST_TIMEOUT,
                    peer.list_resource_templates(params),
                )
                .await
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
                Err(err) => warn!(error = %err, "resources/templates/list task failed to join"),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let mut templates = Vec::new();
        let mut next_cursor = None;
        for (index, outcome) in outcomes {
            let client = &self.clients[index];
            match outcome {
                Ok(listing) => {
                    for mut template in listing.resource_templates {
                        template.raw.description =
                            Some(labeled(&client.name, template.raw.description.as_deref()));
                        templates.push(template);
                    }
                    if listing.next_cursor.is_some() {
                        next_cursor = listing.next_cursor;
                    }
                }
                Err(err) => {
                    warn!(
                        backend = %client.name,
                        error = %err,
                        "resources/templates/list failed, skipping backend"
                    );
                }
            }
        }

        debug!(count = templates.len(), "aggregated resources/templates/list");

        let mut result = ListResourceTemplatesResult::with_all_items(templates);
        result.next_cursor = next_cursor;
        result
    }
}
