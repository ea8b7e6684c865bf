//! CLI command implementations

pub mod buckets;
pub mod objects;
pub mod profile;
pub mod search;
pub mod stats;
pub mod status;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use mirrorlake_cache::{CacheRepository, DatabasePool, SqlitePersistenceAdapter};
use mirrorlake_core::ports::IPersistenceAdapter;

/// Default location of the cache database
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mirrorlake")
        .join("cache.db")
}

/// Opens the cache database and wraps it in a repository
pub async fn open_repository(db: Option<&Path>) -> Result<Arc<CacheRepository>> {
    let path = db.map(Path::to_path_buf).unwrap_or_else(default_db_path);
    let pool = DatabasePool::new(&path)
        .await
        .context("Failed to open cache database")?;
    let adapter: Arc<dyn IPersistenceAdapter> =
        Arc::new(SqlitePersistenceAdapter::new(pool.pool().clone()));
    Ok(Arc::new(CacheRepository::new(adapter)))
}
