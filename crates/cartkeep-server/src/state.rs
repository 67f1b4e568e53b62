//! Application state shared across handlers.

use std::sync::Arc;

use cartkeep_store::CartStore;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The cart store. Its sweeper is owned by whoever built the store.
    pub store: CartStore,

    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(store: CartStore, config: ServerConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
