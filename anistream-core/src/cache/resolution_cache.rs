//! In-memory result cache (Moka)
//!
//! Short-TTL cache of successful source resolutions and search results.
//! Entries are immutable `Arc`s and only ever expire; there is no
//! invalidation beyond TTL.

use std::sync::Arc;
use std::time::Duration;

use moka::future::{Cache, CacheBuilder};

use crate::config::CacheConfig;
use crate::models::AnimeSummary;
use crate::service::Resolution;

#[derive(Clone)]
pub struct ResolutionCache {
    sources: Cache<String, Arc<Resolution>>,
    searches: Cache<String, Arc<Vec<AnimeSummary>>>,
}

impl ResolutionCache {
    /// Create a cache holding up to `max_entries` per map for `ttl`.
    #[must_use]
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            sources: CacheBuilder::new(max_entries).time_to_live(ttl).build(),
            searches: CacheBuilder::new(max_entries).time_to_live(ttl).build(),
        }
    }

    /// `None` when caching is disabled.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.max_entries, Duration::from_secs(config.ttl_seconds)))
    }

    pub async fn get_sources(&self, key: &str) -> Option<Arc<Resolution>> {
        let hit = self.sources.get(key).await;
        tracing::debug!(key, hit = hit.is_some(), "Source cache lookup");
        hit
    }

    /// Store a resolution; exhausted runs are not cached.
    pub async fn insert_sources(&self, key: String, resolution: Arc<Resolution>) {
        if resolution.is_exhausted() {
            return;
        }
        self.sources.insert(key, resolution).await;
    }

    pub async fn get_search(&self, key: &str) -> Option<Arc<Vec<AnimeSummary>>> {
        self.searches.get(key).await
    }

    /// Store search results; empty result sets are not cached.
    pub async fn insert_search(&self, key: String, results: Arc<Vec<AnimeSummary>>) {
        if results.is_empty() {
            return;
        }
        self.searches.insert(key, results).await;
    }
}
