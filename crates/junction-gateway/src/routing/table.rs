//! Routing table snapshots
//!
//! Maps capability identifiers to the owning connected client. Each list call
//! builds a complete replacement table and swaps it in atomically, so an
//! invoke running concurrently sees either the previous enumeration or the
//! new one, never a half-built map. Entries from a backend that disappeared
//! vanish on the next list; a stale identifier then misses rather than
//! routing to the wrong backend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::pool::ConnectedClient;

type Snapshot = Arc<HashMap<String, Arc<ConnectedClient>>>;

/// Identifier → owning client, rebuilt wholesale on every list call.
pub struct RoutingTable {
    snapshot: RwLock<Snapshot>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Replace the table with the results of the latest enumeration.
    pub fn replace(&self, entries: HashMap<String, Arc<ConnectedClient>>) {
        *self.snapshot.write() = Arc::new(entries);
    }

    /// Owning client for an identifier, if it was in the last enumeration.
    pub fn lookup(&self, identifier: &str) -> Option<Arc<ConnectedClient>> {
        self.snapshot.read().get(identifier).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.read().is_empty()
    }
}
