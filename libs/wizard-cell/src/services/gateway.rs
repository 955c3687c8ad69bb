use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::models::{FetchFailure, FieldKey, FilterParams, RemoteOptionSet, ResourceType, WizardOption};
use crate::services::backend::PortalBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { count: usize },
    Failed,
    /// A newer request for the same key was issued, or the key was invalidated,
    /// while this one was in flight.
    Discarded,
}

/// Identifies one issued lookup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    key: FieldKey,
    generation: u64,
}

impl FetchTicket {
    pub fn key(&self) -> FieldKey {
        self.key
    }
}

/// Loads option lists for a wizard. Each key carries a request generation; a
/// response is written back only if no newer request or invalidation happened
/// for that key in the meantime, so arrival order never matters.
pub struct LookupGateway {
    backend: Arc<dyn PortalBackend>,
    sets: RwLock<HashMap<FieldKey, RemoteOptionSet>>,
}

impl LookupGateway {
    pub fn new(backend: Arc<dyn PortalBackend>) -> Self {
        Self {
            backend,
            sets: RwLock::new(HashMap::new()),
        }
    }

    /// Issues one lookup and applies its result if it is still the latest request
    /// for `key` when it resolves.
    pub async fn fetch_options(
        &self,
        key: FieldKey,
        resource: ResourceType,
        filter: FilterParams,
    ) -> FetchOutcome {
        let ticket = self.begin(key).await;
        let result = self.request(resource, &filter).await;
        self.complete(ticket, result).await
    }

    /// Marks `key` as loading and hands out the generation its response must match.
    pub async fn begin(&self, key: FieldKey) -> FetchTicket {
        let mut sets = self.sets.write().await;
        let set = sets.entry(key).or_insert_with(|| RemoteOptionSet::empty(key));
        set.generation += 1;
        set.loading = true;
        set.error = None;
        set.options.clear();

        FetchTicket {
            key,
            generation: set.generation,
        }
    }

    pub async fn request(
        &self,
        resource: ResourceType,
        filter: &FilterParams,
    ) -> Result<Vec<WizardOption>, BackendError> {
        debug!("Fetching {} with {:?}", resource, filter);
        self.backend.list_options(resource, filter).await
    }

    pub async fn complete(
        &self,
        ticket: FetchTicket,
        result: Result<Vec<WizardOption>, BackendError>,
    ) -> FetchOutcome {
        let FetchTicket { key, generation } = ticket;

        let mut sets = self.sets.write().await;
        let Some(set) = sets.get_mut(&key) else {
            return FetchOutcome::Discarded;
        };

        if set.generation != generation {
            debug!(
                "Discarding stale {} response (request {}, current {})",
                key, generation, set.generation
            );
            return FetchOutcome::Discarded;
        }

        set.loading = false;
        match result {
            Ok(options) => {
                let count = options.len();
                set.options = options;
                debug!("Applied {} {} options", count, key);
                FetchOutcome::Applied { count }
            }
            Err(e) => {
                warn!("Failed to load {} options: {}", key, e);
                set.error = Some(FetchFailure::from(&e));
                FetchOutcome::Failed
            }
        }
    }

    /// Empties the set and orphans any request still in flight for it. Sets are
    /// kept rather than removed so their generation keeps counting up.
    pub async fn invalidate(&self, key: FieldKey) {
        let mut sets = self.sets.write().await;
        if let Some(set) = sets.get_mut(&key) {
            set.generation += 1;
            set.loading = false;
            set.error = None;
            set.options.clear();
            debug!("Invalidated {} options", key);
        }
    }

    pub async fn invalidate_many(&self, keys: &[FieldKey]) {
        for key in keys {
            self.invalidate(*key).await;
        }
    }

    pub async fn invalidate_all(&self) {
        let keys: Vec<FieldKey> = self.sets.read().await.keys().copied().collect();
        self.invalidate_many(&keys).await;
    }

    pub async fn option_set(&self, key: FieldKey) -> Option<RemoteOptionSet> {
        self.sets.read().await.get(&key).cloned()
    }

    pub async fn option_sets(&self) -> Vec<RemoteOptionSet> {
        let mut sets: Vec<RemoteOptionSet> = self.sets.read().await.values().cloned().collect();
        sets.sort_by_key(|set| set.key);
        sets
    }

    pub async fn find_option(&self, key: FieldKey, option_id: &str) -> Option<WizardOption> {
        self.sets
            .read()
            .await
            .get(&key)
            .and_then(|set| set.find(option_id).cloned())
    }
}
