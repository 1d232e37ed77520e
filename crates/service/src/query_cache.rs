//! Listing cache keyed by collection and page.
//!
//! Invalidation bumps a per-collection generation; reads always use the
//! current generation so a stale page is never served after a mutation.
//! Entries of older generations age out through capacity and TTL.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache;
use tracing::debug;

use crate::backend::{Collection, RawPage};
use crate::errors::RemoteError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub collection: Collection,
    pub page: u32,
    pub limit: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Slot {
    key: QueryKey,
    generation: u64,
}

pub struct QueryCache {
    entries: Cache<Slot, Arc<RawPage>>,
    generations: DashMap<Collection, u64>,
}

impl QueryCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity).time_to_live(ttl).build(),
            generations: DashMap::new(),
        }
    }

    pub fn from_config(cfg: &configs::ListingConfig) -> Self {
        Self::new(cfg.cache_capacity, Duration::from_secs(cfg.cache_ttl_secs))
    }

    pub fn generation(&self, collection: Collection) -> u64 {
        self.generations.get(&collection).map(|g| *g).unwrap_or(0)
    }

    fn slot(&self, key: QueryKey) -> Slot {
        Slot { generation: self.generation(key.collection), key }
    }

    /// Cached page for `key`, or run `fetch` and cache its result.
    /// Concurrent calls for the same key share one fetch; failures are not cached.
    pub async fn get_or_fetch<F>(&self, key: QueryKey, fetch: F) -> Result<Arc<RawPage>, RemoteError>
    where
        F: Future<Output = Result<RawPage, RemoteError>>,
    {
        let slot = self.slot(key);
        self.entries
            .try_get_with(slot, async move { fetch.await.map(Arc::new) })
            .await
            .map_err(|e: Arc<RemoteError>| (*e).clone())
    }

    pub fn contains(&self, key: QueryKey) -> bool {
        self.entries.contains_key(&self.slot(key))
    }

    /// Mark every cached page of `collection` stale.
    pub fn invalidate(&self, collection: Collection) {
        let mut generation = self.generations.entry(collection).or_insert(0);
        *generation += 1;
        debug!(%collection, generation = *generation, "listing cache invalidated");
    }

    /// Drop everything, e.g. on sign-out.
    pub fn clear(&self) {
        for collection in Collection::ALL {
            self.invalidate(collection);
        }
        self.entries.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(collection: Collection, page: u32) -> QueryKey {
        QueryKey { collection, page, limit: 8 }
    }

    fn cache() -> QueryCache {
        QueryCache::new(100, Duration::from_secs(60))
    }

    async fn load(calls: &AtomicUsize, total: u64) -> Result<RawPage, RemoteError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(RawPage { rows: Vec::new(), total })
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        cache.get_or_fetch(key(Collection::Products, 1), load(&calls, 3)).await.unwrap();
        let page = cache.get_or_fetch(key(Collection::Products, 1), load(&calls, 99)).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_refetch_of_that_collection_only() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        cache.get_or_fetch(key(Collection::Products, 1), load(&calls, 3)).await.unwrap();
        cache.get_or_fetch(key(Collection::Categories, 1), load(&calls, 5)).await.unwrap();

        cache.invalidate(Collection::Products);
        assert!(!cache.contains(key(Collection::Products, 1)));
        assert!(cache.contains(key(Collection::Categories, 1)));

        let page = cache.get_or_fetch(key(Collection::Products, 1), load(&calls, 2)).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let err = cache
            .get_or_fetch(key(Collection::Profiles, 1), async { Err(RemoteError::new("boom")) })
            .await
            .unwrap_err();
        assert_eq!(err.message, "boom");
        cache.get_or_fetch(key(Collection::Profiles, 1), load(&calls, 1)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_fetch() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let k = key(Collection::Products, 2);
        let (a, b) = tokio::join!(
            cache.get_or_fetch(k, async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                load(&calls, 4).await
            }),
            cache.get_or_fetch(k, async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                load(&calls, 4).await
            }),
        );
        assert_eq!(a.unwrap().total, b.unwrap().total);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_drops_all_collections() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        for c in Collection::ALL {
            cache.get_or_fetch(key(c, 1), load(&calls, 1)).await.unwrap();
        }
        cache.clear();
        for c in Collection::ALL {
            assert!(!cache.contains(key(c, 1)));
        }
    }
}
