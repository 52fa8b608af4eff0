use std::sync::Arc;

use crate::auth::AccountStore;
use crate::catalog::{CatalogDocument, CatalogStore};
use crate::env::Config;
use crate::game_sessions::GameSessionStore;
use crate::query::QueryEngine;
use crate::store::KvStore;

/// Everything the handlers share, managed by Rocket as one value.
pub struct AppState {
    pub config: Config,
    pub kv: KvStore,
    pub catalog: Arc<CatalogStore>,
    pub engine: QueryEngine,
    pub accounts: AccountStore,
    pub game_sessions: GameSessionStore,
}

impl AppState {
    pub fn new(config: Config, kv: KvStore, document: CatalogDocument) -> Self {
        let catalog = Arc::new(CatalogStore::new(kv.clone(), document));
        let engine = QueryEngine::new(Arc::clone(&catalog), config.search_debounce);
        let accounts = AccountStore::new(kv.clone(), config.bcrypt_cost);
        let game_sessions = GameSessionStore::new(kv.clone());

        Self {
            config,
            kv,
            catalog,
            engine,
            accounts,
            game_sessions,
        }
    }
}
