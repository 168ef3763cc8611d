//! Store-backed cache registry.
//!
//! Tracks which response keys exist, globally and per category, using the
//! store's own set primitives so that invalidation never scans the whole
//! keyspace and no membership state lives in this process.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use tracing::{debug, info, instrument, warn};

use super::keys::{
    CacheKey, Category, GLOBAL_REGISTRY_KEY, category_registry_key, exact_key, has_wildcard,
    key_category, scan_pattern,
};
use super::store::{KvStore, StoreError};

const METRIC_PURGED_KEYS: &str = "agora_cache_purged_keys_total";
const METRIC_PURGE_MS: &str = "agora_cache_purge_ms";
const PURGE_CONCURRENCY: usize = 16;

pub struct CacheRegistry {
    store: Arc<dyn KvStore>,
}

impl CacheRegistry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Record a freshly stored key in the global and category registries.
    pub async fn register(&self, key: &CacheKey, category: Category) -> Result<(), StoreError> {
        self.store.set_add(GLOBAL_REGISTRY_KEY, key.as_str()).await?;
        self.store
            .set_add(&category_registry_key(category.as_str()), key.as_str())
            .await
    }

    /// Number of keys in the global registry, including members whose entry
    /// already expired.
    pub async fn registered_count(&self) -> Result<usize, StoreError> {
        self.store.set_len(GLOBAL_REGISTRY_KEY).await
    }

    /// Remove every cached response under a category name or key pattern.
    ///
    /// Runs the registry pass (plain category names only), then a pattern
    /// scan that also catches keys the registry lost track of, and finally a
    /// single exact-key delete when neither removed anything. Returns the
    /// number of entries deleted; a disconnected store yields 0.
    #[instrument(skip(self))]
    pub async fn purge(&self, scope: &str) -> usize {
        if !self.store.is_ready() {
            debug!(cache = "registry", "store disconnected, purge skipped");
            return 0;
        }

        let started_at = Instant::now();
        let mut removed = 0;

        if !has_wildcard(scope) {
            match self.purge_registered(scope).await {
                Ok(count) => removed += count,
                Err(err) => warn!(cache = "registry", strategy = "registry", error = %err, "purge step failed"),
            }
        }

        match self.purge_matching(scope).await {
            Ok(count) => removed += count,
            Err(err) => warn!(cache = "registry", strategy = "scan", error = %err, "purge step failed"),
        }

        if removed == 0 {
            match self.purge_exact(scope).await {
                Ok(count) => removed += count,
                Err(err) => warn!(cache = "registry", strategy = "exact", error = %err, "purge step failed"),
            }
        }

        counter!(METRIC_PURGED_KEYS).increment(removed as u64);
        histogram!(METRIC_PURGE_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);
        info!(cache = "registry", removed, "cache purge complete");

        removed
    }

    async fn purge_registered(&self, category: &str) -> Result<usize, StoreError> {
        let registry_key = category_registry_key(category);
        let members = self.store.set_members(&registry_key).await?;
        let removed = self.evict_all(members, Some(category)).await;
        self.store.delete(&registry_key).await?;
        Ok(removed)
    }

    async fn purge_matching(&self, scope: &str) -> Result<usize, StoreError> {
        let keys = self.store.keys_matching(&scan_pattern(scope)).await?;
        Ok(self.evict_all(keys, None).await)
    }

    async fn purge_exact(&self, scope: &str) -> Result<usize, StoreError> {
        let key = exact_key(scope);
        if !self.store.exists(&key).await? {
            return Ok(0);
        }
        Ok(usize::from(self.evict(&key, None).await?))
    }

    async fn evict_all(&self, keys: Vec<String>, category: Option<&str>) -> usize {
        stream::iter(keys)
            .map(|key| async move {
                match self.evict(&key, category).await {
                    Ok(removed) => removed,
                    Err(err) => {
                        warn!(cache = "registry", key = %key, error = %err, "failed to evict key");
                        false
                    }
                }
            })
            .buffer_unordered(PURGE_CONCURRENCY)
            .filter(|removed| futures::future::ready(*removed))
            .count()
            .await
    }

    /// Delete one entry and drop it from both registries.
    async fn evict(&self, key: &str, category: Option<&str>) -> Result<bool, StoreError> {
        let removed = self.store.delete(key).await?;
        if let Some(category) = category.or_else(|| key_category(key)) {
            self.store
                .set_remove(&category_registry_key(category), key)
                .await?;
        }
        self.store.set_remove(GLOBAL_REGISTRY_KEY, key).await?;
        Ok(removed)
    }
}
