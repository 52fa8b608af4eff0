use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use super::{Debouncer, EntityDetail, QueryRequest, TaggedEntity, detail, query};
use crate::catalog::{CatalogStore, EntityId, TableName};

/// One published batch of live-search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub generation: u64,
    pub title: String,
    pub request: QueryRequest,
    pub items: Vec<TaggedEntity>,
}

/// Query front end over the catalog store. Direct queries run immediately;
/// live search goes through the debouncer and publishes on a watch channel.
pub struct QueryEngine {
    catalog: Arc<CatalogStore>,
    debouncer: Debouncer,
    // Held while a generation is issued and its task scheduled, so the
    // surviving debounced task always carries the newest generation.
    submit_lock: Mutex<()>,
    generation: Arc<AtomicU64>,
    executions: Arc<AtomicU64>,
    results: Arc<watch::Sender<Option<SearchResults>>>,
}

impl QueryEngine {
    pub fn new(catalog: Arc<CatalogStore>, debounce: Duration) -> Self {
        let (results, _) = watch::channel(None);
        Self {
            catalog,
            debouncer: Debouncer::new(debounce),
            submit_lock: Mutex::new(()),
            generation: Arc::new(AtomicU64::new(0)),
            executions: Arc::new(AtomicU64::new(0)),
            results: Arc::new(results),
        }
    }

    pub fn query(&self, request: &QueryRequest) -> Vec<TaggedEntity> {
        query(&self.catalog.snapshot(), request)
    }

    pub fn detail(&self, table: TableName, id: &EntityId) -> Option<EntityDetail> {
        detail(&self.catalog.snapshot(), table, id)
    }

    /// Schedules a debounced search and returns its generation. Results of a
    /// generation that has been superseded are never published.
    #[instrument(skip(self), fields(term = %request.term, sort = %request.sort))]
    pub fn submit(&self, request: QueryRequest) -> u64 {
        let _submitting = match self.submit_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let catalog = Arc::clone(&self.catalog);
        let latest = Arc::clone(&self.generation);
        let executions = Arc::clone(&self.executions);
        let results = Arc::clone(&self.results);

        self.debouncer.schedule(async move {
            if latest.load(Ordering::SeqCst) != generation {
                debug!(generation, "Skipping superseded search");
                return;
            }

            executions.fetch_add(1, Ordering::SeqCst);
            let items = query(&catalog.snapshot(), &request);
            info!(generation, hits = items.len(), "Search executed");

            let batch = SearchResults {
                generation,
                title: search_title(&request),
                request,
                items,
            };

            publish_if_current(&results, &latest, batch);
        });

        generation
    }

    pub fn latest(&self) -> Option<SearchResults> {
        self.results.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SearchResults>> {
        self.results.subscribe()
    }

    /// Number of searches that actually ran.
    pub fn executed_searches(&self) -> u64 {
        self.executions.load(Ordering::SeqCst)
    }
}

/// Publishes a finished batch unless a newer search has been submitted since.
fn publish_if_current(
    results: &watch::Sender<Option<SearchResults>>,
    latest: &AtomicU64,
    batch: SearchResults,
) -> bool {
    let generation = batch.generation;
    let published = results.send_if_modified(|current| {
        if latest.load(Ordering::SeqCst) != generation {
            return false;
        }
        *current = Some(batch);
        true
    });

    if !published {
        debug!(generation, "Discarding stale search results");
    }
    published
}

/// Heading for a result list: the quoted term, or the scope name when the
/// term is blank.
pub fn search_title(request: &QueryRequest) -> String {
    let term = request.term.trim();
    if term.is_empty() {
        request.scope.title()
    } else {
        format!("Результаты поиска: \"{}\"", term)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use tokio::sync::watch;

    use super::{SearchResults, publish_if_current};
    use crate::query::{QueryRequest, Scope};

    fn batch(generation: u64, term: &str) -> SearchResults {
        SearchResults {
            generation,
            title: term.to_string(),
            request: QueryRequest {
                scope: Scope::All,
                term: term.to_string(),
                ..Default::default()
            },
            items: Vec::new(),
        }
    }

    #[test]
    fn test_results_finishing_out_of_order_keep_the_newest() {
        let (results, receiver) = watch::channel(None);
        let latest = AtomicU64::new(2);

        assert!(!publish_if_current(&results, &latest, batch(1, "эльф")));
        assert!(receiver.borrow().is_none());

        assert!(publish_if_current(&results, &latest, batch(2, "дракон")));
        assert!(!publish_if_current(&results, &latest, batch(1, "эльф")));

        let current = receiver.borrow().clone().expect("published");
        assert_eq!(current.generation, 2);
        assert_eq!(current.request.term, "дракон");
    }
}
