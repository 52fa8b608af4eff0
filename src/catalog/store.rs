use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use super::{CatalogDocument, Entity, EntityId, TableName, fields};
use crate::error::AppError;
use crate::store::{KvStore, keys};

pub const EXPORT_FILENAME: &str = "dnd_database_export.json";

/// Holds the current catalog. Readers take a snapshot; writers build a new
/// document and swap it in whole.
pub struct CatalogStore {
    current: ArcSwap<CatalogDocument>,
    write_lock: Mutex<()>,
    kv: KvStore,
}

impl CatalogStore {
    pub fn new(kv: KvStore, document: CatalogDocument) -> Self {
        Self {
            current: ArcSwap::from_pointee(document),
            write_lock: Mutex::new(()),
            kv,
        }
    }

    /// Reads and parses the catalog source, giving up after `timeout`.
    #[instrument]
    pub async fn load(path: &Path, timeout: Duration) -> Result<CatalogDocument, AppError> {
        info!("Loading catalog");

        let raw = match tokio::time::timeout(timeout, tokio::fs::read_to_string(path)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                return Err(AppError::Load(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )));
            }
            Err(_) => {
                return Err(AppError::Load(format!(
                    "timed out after {:?} reading {}",
                    timeout,
                    path.display()
                )));
            }
        };

        let document = CatalogDocument::parse(&raw)
            .map_err(|e| AppError::Load(format!("malformed catalog {}: {}", path.display(), e)))?;

        info!(items = document.total_items(), "Catalog loaded");
        Ok(document)
    }

    pub fn snapshot(&self) -> Arc<CatalogDocument> {
        self.current.load_full()
    }

    /// Swaps in `document` and writes it under the admin snapshot key. Callers
    /// hold `write_lock`, so snapshots reach the store in swap order.
    async fn commit(&self, document: CatalogDocument) -> Result<(), AppError> {
        let document = Arc::new(document);
        self.current.store(Arc::clone(&document));
        self.kv.set(keys::ADMIN_DATABASE, document.as_ref()).await
    }

    pub fn entities(&self, table: TableName) -> Vec<Entity> {
        self.snapshot().table(table).to_vec()
    }

    pub fn total_items(&self) -> usize {
        self.snapshot().total_items()
    }

    /// Applies `change` to a copy of the catalog. The copy is committed only
    /// when `change` reports that it altered something.
    async fn modify<R>(
        &self,
        change: impl FnOnce(&mut CatalogDocument) -> (R, bool),
    ) -> Result<R, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut next = CatalogDocument::clone(&self.snapshot());
        let (outcome, changed) = change(&mut next);
        if changed {
            self.commit(next).await?;
        }
        Ok(outcome)
    }

    #[instrument(skip(self, attributes))]
    pub async fn add(
        &self,
        table: TableName,
        attributes: Map<String, Value>,
    ) -> Result<EntityId, AppError> {
        let id = self
            .modify(|document| {
                let rows = document.table_mut(table);
                let id = next_entity_id(rows);

                let mut entity = Entity::new(attributes);
                entity.set(fields::ID, Value::from(id));
                rows.push(entity);

                (EntityId::Number(id), true)
            })
            .await?;

        info!(%id, "Added catalog entity");
        Ok(id)
    }

    #[instrument(skip(self, attributes))]
    pub async fn update(
        &self,
        table: TableName,
        id: &EntityId,
        attributes: Map<String, Value>,
    ) -> Result<bool, AppError> {
        let found = self
            .modify(|document| {
                match document
                    .table_mut(table)
                    .iter_mut()
                    .find(|entity| entity.id().as_ref() == Some(id))
                {
                    Some(entity) => {
                        entity.merge(attributes);
                        (true, true)
                    }
                    None => (false, false),
                }
            })
            .await?;

        if !found {
            warn!("Update target not found");
        }
        Ok(found)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, table: TableName, id: &EntityId) -> Result<bool, AppError> {
        self.modify(|document| {
            let rows = document.table_mut(table);
            let before = rows.len();
            rows.retain(|entity| entity.id().as_ref() != Some(id));
            let removed = before != rows.len();
            (removed, removed)
        })
        .await
    }

    /// Replaces the catalog with an uploaded document. A document that does
    /// not parse is rejected and the current catalog stays in place.
    #[instrument(skip(self, raw), fields(bytes = raw.len()))]
    pub async fn import(&self, raw: &str) -> Result<usize, AppError> {
        let document = CatalogDocument::parse(raw).map_err(AppError::Import)?;
        let items = document.total_items();

        let _guard = self.write_lock.lock().await;
        info!(items, "Replacing catalog");
        self.commit(document).await?;
        Ok(items)
    }

    pub fn export(&self) -> Result<String, AppError> {
        Ok(self.snapshot().to_pretty_json()?)
    }
}

/// Time-based id, bumped past the largest numeric id already in the table.
fn next_entity_id(rows: &[Entity]) -> i64 {
    let now = Utc::now().timestamp_millis();
    let max_existing = rows
        .iter()
        .filter_map(|entity| entity.id().and_then(|id| id.as_number()))
        .max();

    match max_existing {
        Some(max) if max >= now => max + 1,
        _ => now,
    }
}
