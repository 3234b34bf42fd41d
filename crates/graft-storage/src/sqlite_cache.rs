//! SQLite-backed state cache.

use std::sync::Arc;

use graft_core::errors::StorageError;
use graft_core::traits::DurableCache;

use crate::connection::DatabaseManager;
use crate::queries::state_cache;

pub struct SqliteStateCache {
    db: Arc<DatabaseManager>,
}

impl SqliteStateCache {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

impl DurableCache for SqliteStateCache {
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.db.with_writer(|conn| state_cache::upsert(conn, key, value))
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.db.with_writer(|conn| state_cache::get(conn, key))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.db.with_writer(|conn| state_cache::delete(conn, key))
    }
}
