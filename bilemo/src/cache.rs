//! Tag-addressable response cache.
//!
//! List endpoints read through a [`TagAwareCache`] keyed by their query parameters, and every
//! mutating endpoint invalidates the tag covering those lists once its transaction has committed.
//!
//! Each tag carries a generation counter. A loader snapshots the generations of its tags before
//! it runs, and the resulting entry is stamped with that snapshot. Invalidation bumps the
//! generation and evicts every key indexed under the tag, so an entry whose loader raced with an
//! invalidation is stamped with an old generation and is treated as a miss even if it was
//! inserted after the eviction pass.

use crate::config::CacheConfig;
use dashmap::DashMap;
use moka::{future::Cache, notification::RemovalCause};
use std::{collections::HashSet, future::Future, sync::Arc};
use tracing::{debug, instrument};

/// Tag covering every cached product page
pub const PRODUCTS_CACHE_TAG: &str = "productsCache";
/// Tag covering every cached user list
pub const USERS_CACHE_TAG: &str = "usersCache";

pub fn products_page_key(page: u32, limit: u32) -> String {
    format!("getAllProducts-{page}-{limit}")
}

pub fn users_list_key(client_id: crate::types::ClientId) -> String {
    format!("getAllUsers-{client_id}")
}

#[derive(Clone)]
struct Entry<V> {
    value: V,
    stamps: Vec<(String, u64)>,
}

#[derive(Debug, Default)]
struct TagIndex {
    generation: u64,
    keys: HashSet<String>,
}

pub struct TagAwareCache<V> {
    entries: Cache<String, Entry<V>>,
    tags: Arc<DashMap<String, TagIndex>>,
}

impl<V> Clone for TagAwareCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            tags: Arc::clone(&self.tags),
        }
    }
}

impl<V> std::fmt::Debug for TagAwareCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagAwareCache")
            .field("entries", &self.entries.entry_count())
            .field("tags", &self.tags.len())
            .finish()
    }
}

impl<V> TagAwareCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: &CacheConfig) -> Self {
        let tags: Arc<DashMap<String, TagIndex>> = Arc::new(DashMap::new());

        let index = Arc::clone(&tags);
        let mut builder = Cache::builder()
            .max_capacity(config.max_capacity)
            .eviction_listener(move |key: Arc<String>, entry: Entry<V>, cause| {
                // A replaced key has already been re-registered by the insert that replaced it
                if cause == RemovalCause::Replaced {
                    return;
                }
                for (tag, _) in &entry.stamps {
                    if let Some(mut tag_index) = index.get_mut(tag) {
                        tag_index.keys.remove(key.as_str());
                    }
                }
            });
        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            entries: builder.build(),
            tags,
        }
    }

    /// Return the value cached under `key`, or run `loader` and cache its output under `tags`.
    ///
    /// Loader errors are returned as-is and nothing is cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: &str, tags: &[&str], loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(entry) = self.entries.get(key).await {
            if self.is_current(&entry.stamps) {
                debug!(key, "Cache hit");
                return Ok(entry.value);
            }
        }

        debug!(key, "Cache miss");
        let stamps = self.snapshot(tags);
        let value = loader().await?;

        // Index the key before inserting, so an invalidation between the two still evicts it
        for (tag, generation) in &stamps {
            let mut tag_index = self.tags.entry(tag.clone()).or_default();
            if tag_index.generation != *generation {
                debug!(key, tag = %tag, "Tag invalidated while loading, not caching");
                return Ok(value);
            }
            tag_index.keys.insert(key.to_string());
        }

        self.entries
            .insert(
                key.to_string(),
                Entry {
                    value: value.clone(),
                    stamps,
                },
            )
            .await;
        Ok(value)
    }

    /// Evict every entry registered under any of `tags`.
    #[instrument(skip(self))]
    pub async fn invalidate_tags(&self, tags: &[&str]) {
        for tag in tags {
            let keys = {
                let mut tag_index = self.tags.entry((*tag).to_string()).or_default();
                tag_index.generation += 1;
                std::mem::take(&mut tag_index.keys)
            };
            debug!(tag, evicted = keys.len(), "Invalidated cache tag");
            for key in keys {
                self.entries.invalidate(&key).await;
            }
        }
    }

    fn snapshot(&self, tags: &[&str]) -> Vec<(String, u64)> {
        tags.iter()
            .map(|tag| {
                let generation = self.tags.entry((*tag).to_string()).or_default().generation;
                ((*tag).to_string(), generation)
            })
            .collect()
    }

    fn is_current(&self, stamps: &[(String, u64)]) -> bool {
        stamps
            .iter()
            .all(|(tag, generation)| self.tags.get(tag).is_some_and(|index| index.generation == *generation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{Notify, oneshot};

    fn cache() -> TagAwareCache<String> {
        TagAwareCache::new(&CacheConfig::default())
    }

    async fn load(cache: &TagAwareCache<String>, key: &str, tags: &[&str], value: &str, calls: &AtomicUsize) -> String {
        cache
            .get_or_try_insert_with(key, tags, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::convert::Infallible>(value.to_string())
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_cache_keys() {
        assert_eq!(products_page_key(1, 3), "getAllProducts-1-3");
        assert_eq!(products_page_key(4, 10), "getAllProducts-4-10");
        assert_eq!(users_list_key(7), "getAllUsers-7");
    }

    #[tokio::test]
    async fn test_second_read_is_served_from_cache() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        assert_eq!(load(&cache, "k", &["t"], "first", &calls).await, "first");
        assert_eq!(load(&cache, "k", &["t"], "second", &calls).await, "first");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidation_forces_reload() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        load(&cache, "page-1", &[PRODUCTS_CACHE_TAG], "old", &calls).await;
        load(&cache, "page-2", &[PRODUCTS_CACHE_TAG], "old", &calls).await;
        cache.invalidate_tags(&[PRODUCTS_CACHE_TAG]).await;

        assert_eq!(load(&cache, "page-1", &[PRODUCTS_CACHE_TAG], "new", &calls).await, "new");
        assert_eq!(load(&cache, "page-2", &[PRODUCTS_CACHE_TAG], "new", &calls).await, "new");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_invalidating_one_tag_keeps_others() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        load(&cache, "products", &[PRODUCTS_CACHE_TAG], "p", &calls).await;
        load(&cache, "users", &[USERS_CACHE_TAG], "u", &calls).await;
        cache.invalidate_tags(&[USERS_CACHE_TAG]).await;

        assert_eq!(load(&cache, "products", &[PRODUCTS_CACHE_TAG], "p2", &calls).await, "p");
        assert_eq!(load(&cache, "users", &[USERS_CACHE_TAG], "u2", &calls).await, "u2");
    }

    #[tokio::test]
    async fn test_loader_errors_are_not_cached() {
        let cache = cache();

        let failed: Result<String, &str> = cache.get_or_try_insert_with("k", &["t"], || async { Err("boom") }).await;
        assert_eq!(failed, Err("boom"));

        let ok: Result<String, &str> = cache.get_or_try_insert_with("k", &["t"], || async { Ok("fine".to_string()) }).await;
        assert_eq!(ok.unwrap(), "fine");
    }

    #[tokio::test]
    async fn test_load_racing_with_invalidation_is_not_served() {
        let cache = cache();
        let release = Arc::new(Notify::new());
        let (started_tx, started_rx) = oneshot::channel();

        let racing = {
            let cache = cache.clone();
            let release = Arc::clone(&release);
            tokio::spawn(async move {
                cache
                    .get_or_try_insert_with("k", &[PRODUCTS_CACHE_TAG], || async move {
                        let _ = started_tx.send(());
                        release.notified().await;
                        Ok::<_, std::convert::Infallible>("stale".to_string())
                    })
                    .await
                    .unwrap()
            })
        };

        // The loader has snapshotted the generation; a write lands and invalidates
        started_rx.await.unwrap();
        cache.invalidate_tags(&[PRODUCTS_CACHE_TAG]).await;
        release.notify_one();
        assert_eq!(racing.await.unwrap(), "stale");

        let calls = AtomicUsize::new(0);
        assert_eq!(load(&cache, "k", &[PRODUCTS_CACHE_TAG], "fresh", &calls).await, "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let cache: TagAwareCache<String> = TagAwareCache::new(&CacheConfig {
            max_capacity: 100,
            ttl: Some(Duration::from_millis(50)),
        });
        let calls = AtomicUsize::new(0);

        load(&cache, "k", &["t"], "first", &calls).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(load(&cache, "k", &["t"], "second", &calls).await, "second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
