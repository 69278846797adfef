/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 *   - catalog: CatalogClient (holds the shared TokenSource)
 *   - store: cache backend for the health probe
 * - Clone is expected (everything inside is Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::{cache::StoreHealth, spotify::CatalogClient};

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogClient,
    pub store: Arc<dyn StoreHealth>,
}

impl AppState {
    pub fn new(catalog: CatalogClient, store: Arc<dyn StoreHealth>) -> Self {
        Self { catalog, store }
    }
}
