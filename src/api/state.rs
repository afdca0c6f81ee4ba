use std::sync::Arc;

use crate::db::MemoryStorage;
use crate::services::Catalog;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    /// Used by /films/popular when the request gives no count
    pub popular_films_default_count: i64,
}

impl AppState {
    pub fn new(catalog: Catalog, popular_films_default_count: i64) -> Self {
        Self {
            catalog,
            popular_films_default_count,
        }
    }

    /// State backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Catalog::with_storage(Arc::new(MemoryStorage::new())), 10)
    }
}
