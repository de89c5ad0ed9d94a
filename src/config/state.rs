// Application state module
// Shared by every connection task

use std::sync::Arc;
use tokio::sync::RwLock;

use super::types::Config;
use crate::store::{SharedStore, UserStore};

/// Application state
pub struct AppState {
    pub config: Config,
    pub store: SharedStore,
}

impl AppState {
    pub fn new(config: &Config, store: UserStore) -> Self {
        Self {
            config: config.clone(),
            store: Arc::new(RwLock::new(store)),
        }
    }

    /// Put the mock dataset back to its seed state
    pub async fn reset_store(&self) {
        self.store.write().await.reset();
    }
}
