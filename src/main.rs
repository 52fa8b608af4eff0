#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod catalog;
mod env;
mod error;
mod game_sessions;
mod notify;
mod query;
mod state;
mod store;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use api::{
    api_admin_add_entity, api_admin_clear_inactive, api_admin_delete_entity,
    api_admin_delete_user, api_admin_end_session, api_admin_export, api_admin_import,
    api_admin_sessions, api_admin_stats, api_admin_table, api_admin_update_entity,
    api_admin_users, api_entity_detail, api_latest_search, api_login, api_logout, api_me,
    api_protected_page, api_query_catalog, api_register, api_submit_search, health,
};
use auth::{forbidden_api, unauthorized_api};
use catalog::{CatalogDocument, CatalogStore};
use env::{Config, load_environment};
use rocket::{Build, Rocket};
use state::AppState;
use store::KvStore;
use telemetry::{OtelGuard, TelemetryFairing, init_tracing};
use tracing::{error, info, warn};

#[launch]
async fn rocket() -> _ {
    if let Err(e) = load_environment() {
        eprintln!("Failed to load environment files: {:#}", e);
    }

    let guard = match init_tracing() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise tracing: {:#}", e);
            None
        }
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            panic!("Invalid configuration: {:#}", e);
        }
    };

    let kv = match KvStore::connect(&config.database_url).await {
        Ok(kv) => kv,
        Err(e) => {
            error!("Failed to open key-value store: {}", e);
            panic!("Key-value store unavailable: {}", e);
        }
    };

    // A missing or broken catalog leaves the handbook empty but running.
    let document =
        match CatalogStore::load(&config.catalog_path, config.catalog_load_timeout).await {
            Ok(document) => document,
            Err(e) => {
                e.log_and_record("Startup catalog load");
                warn!("Starting with an empty catalog");
                CatalogDocument::new()
            }
        };

    let state = AppState::new(config, kv, document);

    if let Err(e) = state.game_sessions.seed_if_absent().await {
        e.log_and_record("Seeding game sessions");
    }

    init_rocket(state, guard)
}

pub fn init_rocket(state: AppState, guard: Option<OtelGuard>) -> Rocket<Build> {
    info!("Starting DM handbook");

    rocket::build()
        .manage(state)
        .mount(
            "/api",
            routes![
                health,
                api_query_catalog,
                api_entity_detail,
                api_submit_search,
                api_latest_search,
                api_register,
                api_login,
                api_logout,
                api_me,
                api_protected_page,
                api_admin_stats,
                api_admin_users,
                api_admin_delete_user,
                api_admin_clear_inactive,
                api_admin_sessions,
                api_admin_end_session,
                api_admin_table,
                api_admin_add_entity,
                api_admin_update_entity,
                api_admin_delete_entity,
                api_admin_export,
                api_admin_import,
            ],
        )
        .register("/api", catchers![unauthorized_api, forbidden_api])
        .attach(TelemetryFairing::new(guard))
}
