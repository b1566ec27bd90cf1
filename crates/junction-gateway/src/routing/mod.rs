//! Capability routing
//!
//! One router per capability kind. `list` fans out to every connected
//! backend, merges the survivors, labels each item with its owning backend,
//! and rebuilds that kind's routing table. The invoke operations (`call`,
//! `get`, `read`) look the identifier up in the table and forward the request
//! verbatim to the single owning backend.

mod prompts;
mod resources;
mod table;
mod tools;

use std::time::Duration;

pub use prompts::PromptRouter;
pub use resources::{ResourceRouter, ResourceTemplateRouter};
pub use table::RoutingTable;
pub use tools::ToolRouter;

/// Budget for each backend's share of a list fan-out. A backend that blows it
/// is skipped for that call; its siblings are unaffected.
pub(crate) const LIST_TIMEOUT: Duration = Duration::from_secs(30);

/// Prefix a capability description with its owning backend's name, so the
/// aggregate list disambiguates visually without renaming identifiers.
pub(crate) fn labeled(backend: &str, description: Option<&str>) -> String {
    match description {
        Some(text) => format!("[{backend}] {text}"),
        None => format!("[{backend}]"),
    }
}
