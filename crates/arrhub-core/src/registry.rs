//! Registry mapping backend kinds to active service clients.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrhub_events::BackendKind;

use crate::service::BackendService;

/// Active clients keyed by backend kind.
///
/// Absent entries mean "disabled": every aggregation loop skips them without
/// error, and commands targeting them fail with
/// [`crate::CommandError::UnconfiguredBackend`]. The registry is immutable
/// once built; reconfiguration replaces it wholesale.
#[derive(Default)]
pub struct ClientRegistry {
    clients: BTreeMap<BackendKind, Arc<dyn BackendService>>,
}

impl ClientRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its own kind, replacing any previous entry.
    pub fn insert(&mut self, client: Arc<dyn BackendService>) {
        self.clients.insert(client.kind(), client);
    }

    /// The client for a kind, if one is registered.
    #[must_use]
    pub fn get(&self, kind: BackendKind) -> Option<Arc<dyn BackendService>> {
        self.clients.get(&kind).cloned()
    }

    /// Iterate over all registered clients in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (BackendKind, Arc<dyn BackendService>)> + '_ {
        self.clients
            .iter()
            .map(|(kind, client)| (*kind, Arc::clone(client)))
    }

    /// Iterate over the registered media managers only.
    pub fn media_managers(
        &self,
    ) -> impl Iterator<Item = (BackendKind, Arc<dyn BackendService>)> + '_ {
        self.iter().filter(|(kind, _)| kind.is_media_manager())
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no clients are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
