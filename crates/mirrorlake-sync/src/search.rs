//! Debounced search over the cached rows
//!
//! Each searcher wraps one repository search operation with:
//!
//! - a minimum query length: shorter queries resolve to empty immediately,
//!   the repository is never touched
//! - a debounce window: the query only runs once the window elapses
//! - a generation counter: a newer call supersedes any in-flight one, which
//!   then resolves to `None` instead of delivering stale results out of
//!   order (last write wins)
//!
//! The caller drives one searcher per input box and treats `Ok(None)` as
//! "discard, a newer search is running".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mirrorlake_cache::CacheRepository;
use mirrorlake_core::config::SearchConfig;
use mirrorlake_core::domain::{BucketRecord, ObjectMatch, ObjectRecord};

/// Debounce window for per-bucket object search
pub const OBJECT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Debounce window for cross-bucket and bucket-name search
pub const GLOBAL_DEBOUNCE: Duration = Duration::from_millis(300);

/// Queries shorter than this resolve to empty without a repository hit
pub const MIN_QUERY_LEN: usize = 2;

/// Shared debounce/supersede mechanics for all three searchers
struct Debouncer {
    window: Duration,
    min_query_len: usize,
    generation: AtomicU64,
}

impl Debouncer {
    fn new(window: Duration, min_query_len: usize) -> Self {
        Self {
            window,
            min_query_len,
            generation: AtomicU64::new(0),
        }
    }

    /// Claims a new generation, waits out the window, and reports whether
    /// this call is still the latest afterwards
    async fn wait(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.window).await;
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn too_short(&self, query: &str) -> bool {
        query.trim().len() < self.min_query_len
    }
}

/// Debounced object search within one bucket
pub struct ObjectSearcher {
    repo: Arc<CacheRepository>,
    debouncer: Debouncer,
}

impl ObjectSearcher {
    pub fn new(repo: Arc<CacheRepository>) -> Self {
        Self::with_settings(repo, OBJECT_DEBOUNCE, MIN_QUERY_LEN)
    }

    pub fn from_config(repo: Arc<CacheRepository>, config: &SearchConfig) -> Self {
        Self::with_settings(
            repo,
            Duration::from_millis(config.object_debounce_ms),
            config.min_query_len,
        )
    }

    /// Explicit settings, used by tests to shrink the debounce window
    pub fn with_settings(
        repo: Arc<CacheRepository>,
        window: Duration,
        min_query_len: usize,
    ) -> Self {
        Self {
            repo,
            debouncer: Debouncer::new(window, min_query_len),
        }
    }

    /// Runs the search after the debounce window
    ///
    /// `Ok(None)` means a newer search superseded this one and its result
    /// must be discarded.
    pub async fn search(
        &self,
        profile_id: i64,
        bucket: &str,
        query: &str,
    ) -> anyhow::Result<Option<Vec<ObjectRecord>>> {
        if self.debouncer.too_short(query) {
            return Ok(Some(Vec::new()));
        }

        let generation = self.debouncer.wait().await;
        if !self.debouncer.is_current(generation) {
            return Ok(None);
        }

        let results = self.repo.search_objects(profile_id, bucket, query).await?;
        if !self.debouncer.is_current(generation) {
            return Ok(None);
        }
        Ok(Some(results))
    }
}

/// Debounced object search across every bucket of a profile
pub struct GlobalSearcher {
    repo: Arc<CacheRepository>,
    debouncer: Debouncer,
}

impl GlobalSearcher {
    pub fn new(repo: Arc<CacheRepository>) -> Self {
        Self::with_settings(repo, GLOBAL_DEBOUNCE, MIN_QUERY_LEN)
    }

    pub fn from_config(repo: Arc<CacheRepository>, config: &SearchConfig) -> Self {
        Self::with_settings(
            repo,
            Duration::from_millis(config.global_debounce_ms),
            config.min_query_len,
        )
    }

    pub fn with_settings(
        repo: Arc<CacheRepository>,
        window: Duration,
        min_query_len: usize,
    ) -> Self {
        Self {
            repo,
            debouncer: Debouncer::new(window, min_query_len),
        }
    }

    pub async fn search(
        &self,
        profile_id: i64,
        query: &str,
    ) -> anyhow::Result<Option<Vec<ObjectMatch>>> {
        if self.debouncer.too_short(query) {
            return Ok(Some(Vec::new()));
        }

        let generation = self.debouncer.wait().await;
        if !self.debouncer.is_current(generation) {
            return Ok(None);
        }

        let results = self.repo.search_all_objects(profile_id, query).await?;
        if !self.debouncer.is_current(generation) {
            return Ok(None);
        }
        Ok(Some(results))
    }
}

/// Debounced bucket-name search
pub struct BucketSearcher {
    repo: Arc<CacheRepository>,
    debouncer: Debouncer,
}

impl BucketSearcher {
    pub fn new(repo: Arc<CacheRepository>) -> Self {
        Self::with_settings(repo, GLOBAL_DEBOUNCE, MIN_QUERY_LEN)
    }

    pub fn from_config(repo: Arc<CacheRepository>, config: &SearchConfig) -> Self {
        Self::with_settings(
            repo,
            Duration::from_millis(config.global_debounce_ms),
            config.min_query_len,
        )
    }

    pub fn with_settings(
        repo: Arc<CacheRepository>,
        window: Duration,
        min_query_len: usize,
    ) -> Self {
        Self {
            repo,
            debouncer: Debouncer::new(window, min_query_len),
        }
    }

    pub async fn search(
        &self,
        profile_id: i64,
        query: &str,
    ) -> anyhow::Result<Option<Vec<BucketRecord>>> {
        if self.debouncer.too_short(query) {
            return Ok(Some(Vec::new()));
        }

        let generation = self.debouncer.wait().await;
        if !self.debouncer.is_current(generation) {
            return Ok(None);
        }

        let results = self.repo.search_buckets(profile_id, query).await?;
        if !self.debouncer.is_current(generation) {
            return Ok(None);
        }
        Ok(Some(results))
    }
}
