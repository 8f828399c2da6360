//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::config::Config;
use crate::db::sqlite::SqliteStore;
use crate::engine::AccessSyncEngine;
use crate::share::net::NetShareExecutor;

/// State shared across all HTTP handlers.
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persistent directory catalog + access-state store.
    pub store: Arc<SqliteStore>,
    /// The reconciliation core.
    pub engine: AccessSyncEngine<SqliteStore, NetShareExecutor>,
}

impl AppState {
    pub fn new(config: Config, store: SqliteStore) -> Self {
        let executor = NetShareExecutor::from_config(&config);
        Self {
            config: Arc::new(config),
            store: Arc::new(store.clone()),
            engine: AccessSyncEngine::new(store, executor),
        }
    }
}
