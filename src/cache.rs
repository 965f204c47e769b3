//! In-memory dataset cache.
//!
//! The cache is the only shared-mutable-state component in the engine. It is
//! an explicitly constructed object owned by the application state, never a
//! process-wide singleton, so tests can instantiate independent caches.
//!
//! Each cached key holds a build cell ([tokio::sync::OnceCell]) behind the
//! index lock. Concurrent callers for the same uncached key coalesce onto
//! one factory invocation and all receive the same shared dataset; the
//! expensive build itself runs outside the lock. A failed build removes the
//! still-empty cell from the index so subsequent callers can retry.
//!
//! Eviction is bounded by entry count with least-recently-used order over a
//! monotonic access counter. Evicting an entry only drops it from the index;
//! requests still holding the `Arc<Dataset>` keep reading valid data.

use std::future::Future;
use std::sync::{Arc, Mutex};

use hashbrown::HashMap;
use tokio::sync::OnceCell;
use tracing::{event, Level};

use crate::dataset::{CacheKey, Dataset};
use crate::error::PlotServeError;
use crate::metrics;

/// Default maximum number of cached datasets.
pub const DEFAULT_CAPACITY: usize = 20;

struct Slot {
    cell: Arc<OnceCell<Arc<Dataset>>>,
    /// Tick of the most recent access, for LRU ordering.
    last_accessed: u64,
}

struct CacheIndex {
    slots: HashMap<CacheKey, Slot>,
    tick: u64,
}

/// Point-in-time view of the cache contents.
#[derive(Debug, PartialEq, Eq)]
pub struct CacheStatus {
    /// Keys of fully built entries, sorted for stable output.
    pub keys: Vec<String>,
    pub total_entries: usize,
    pub total_size_bytes_estimate: u64,
}

/// Bounded, coalescing cache of generated datasets.
pub struct DatasetCache {
    capacity: usize,
    index: Mutex<CacheIndex>,
}

impl DatasetCache {
    /// Return a cache bounded to `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            index: Mutex::new(CacheIndex {
                slots: HashMap::new(),
                tick: 0,
            }),
        }
    }

    /// Return the cached dataset for `key`, or build it with `factory`.
    ///
    /// The factory is invoked at most once per key even under concurrent
    /// callers; all callers observe the same `Arc<Dataset>`. On factory
    /// failure the in-progress marker is released and the error is returned
    /// to every coalesced caller, leaving the cache without a poisoned
    /// entry.
    pub async fn get_or_create<F, Fut>(
        &self,
        key: CacheKey,
        factory: F,
    ) -> Result<Arc<Dataset>, PlotServeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Dataset, PlotServeError>>,
    {
        let cell = {
            let mut index = self.index.lock().unwrap();
            index.tick += 1;
            let tick = index.tick;
            let slot = index.slots.entry(key.clone()).or_insert_with(|| Slot {
                cell: Arc::new(OnceCell::new()),
                last_accessed: tick,
            });
            slot.last_accessed = tick;
            Arc::clone(&slot.cell)
        };

        let hit = cell.initialized();
        let result = cell
            .get_or_try_init(|| async { factory().await.map(Arc::new) })
            .await;

        match result {
            Ok(dataset) => {
                if hit {
                    metrics::CACHE_HITS.inc();
                } else {
                    metrics::CACHE_MISSES.inc();
                    event!(Level::DEBUG, "cached dataset {}", key);
                    self.evict_beyond_capacity();
                }
                Ok(Arc::clone(dataset))
            }
            Err(err) => {
                // Release the in-progress marker, unless the slot was
                // already replaced (e.g. by a clear and a later retry).
                let mut index = self.index.lock().unwrap();
                let stale = index
                    .slots
                    .get(&key)
                    .map_or(false, |slot| {
                        Arc::ptr_eq(&slot.cell, &cell) && slot.cell.get().is_none()
                    });
                if stale {
                    index.slots.remove(&key);
                }
                Err(err)
            }
        }
    }

    /// Drop entries in least-recently-used order until the number of built
    /// entries fits the capacity. Entries still building are never evicted.
    fn evict_beyond_capacity(&self) {
        let mut index = self.index.lock().unwrap();
        loop {
            let built = index
                .slots
                .iter()
                .filter(|(_, slot)| slot.cell.initialized())
                .count();
            if built <= self.capacity {
                break;
            }
            let victim = index
                .slots
                .iter()
                .filter(|(_, slot)| slot.cell.initialized())
                .min_by_key(|(_, slot)| slot.last_accessed)
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    index.slots.remove(&key);
                    metrics::CACHE_EVICTIONS.inc();
                    event!(Level::DEBUG, "evicted dataset {}", key);
                }
                None => break,
            }
        }
    }

    /// Empty the cache, returning the number of entries dropped.
    ///
    /// Safe to call concurrently with in-flight builds: a detached build
    /// completes on its private cell and its waiters still receive the
    /// dataset; only the index entry is gone.
    pub fn clear(&self) -> usize {
        let mut index = self.index.lock().unwrap();
        let removed = index.slots.len();
        index.slots.clear();
        removed
    }

    /// Report the built entries currently in the index.
    pub fn status(&self) -> CacheStatus {
        let index = self.index.lock().unwrap();
        let mut keys = Vec::new();
        let mut total_size_bytes_estimate = 0;
        for (key, slot) in &index.slots {
            if let Some(dataset) = slot.cell.get() {
                keys.push(key.to_string());
                total_size_bytes_estimate += dataset.meta.size_bytes_estimate;
            }
        }
        keys.sort();
        CacheStatus {
            total_entries: keys.len(),
            keys,
            total_size_bytes_estimate,
        }
    }

    /// Whether `key` has a fully built entry.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let index = self.index.lock().unwrap();
        index
            .slots
            .get(key)
            .map_or(false, |slot| slot.cell.initialized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate;

    use std::sync::atomic::{AtomicUsize, Ordering};

    fn volcano_key(size: u64) -> CacheKey {
        CacheKey::Volcano { size, seed: 42 }
    }

    async fn build(key: CacheKey) -> Result<Dataset, PlotServeError> {
        Ok(generate::generate(&key))
    }

    #[tokio::test]
    async fn get_or_create_returns_same_dataset() {
        let cache = DatasetCache::new(4);
        let key = volcano_key(100);
        let first = cache
            .get_or_create(key.clone(), || build(key.clone()))
            .await
            .unwrap();
        let second = cache
            .get_or_create(key.clone(), || build(key.clone()))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(100, first.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_invoke_factory_once() {
        let cache = Arc::new(DatasetCache::new(4));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = volcano_key(1000);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_create(key.clone(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Hold the build open long enough for the other
                        // callers to pile up on the cell.
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(generate::generate(&key))
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut datasets = Vec::new();
        for handle in handles {
            datasets.push(handle.await.unwrap());
        }
        assert_eq!(1, calls.load(Ordering::SeqCst));
        for dataset in &datasets[1..] {
            assert!(Arc::ptr_eq(&datasets[0], dataset));
        }
    }

    #[tokio::test]
    async fn lru_eviction_drops_least_recently_used() {
        let cache = DatasetCache::new(2);
        let calls = AtomicUsize::new(0);
        let counting_build = |key: CacheKey| {
            calls.fetch_add(1, Ordering::SeqCst);
            build(key)
        };

        let a = volcano_key(100);
        let b = volcano_key(200);
        let c = volcano_key(300);
        cache
            .get_or_create(a.clone(), || counting_build(a.clone()))
            .await
            .unwrap();
        cache
            .get_or_create(b.clone(), || counting_build(b.clone()))
            .await
            .unwrap();
        // Touch `a` so `b` becomes the LRU entry.
        cache
            .get_or_create(a.clone(), || counting_build(a.clone()))
            .await
            .unwrap();
        cache
            .get_or_create(c.clone(), || counting_build(c.clone()))
            .await
            .unwrap();

        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
        assert_eq!(3, calls.load(Ordering::SeqCst));

        // The evicted key regenerates on the next request.
        cache
            .get_or_create(b.clone(), || counting_build(b.clone()))
            .await
            .unwrap();
        assert_eq!(4, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn clear_returns_removed_count() {
        let cache = DatasetCache::new(8);
        for size in [100, 200, 300] {
            let key = volcano_key(size);
            cache
                .get_or_create(key.clone(), || build(key.clone()))
                .await
                .unwrap();
        }
        assert_eq!(3, cache.clear());
        assert_eq!(0, cache.status().total_entries);
        assert_eq!(0, cache.clear());
    }

    #[tokio::test]
    async fn failed_build_releases_marker() {
        let cache = DatasetCache::new(4);
        let key = volcano_key(100);
        let err = cache
            .get_or_create(key.clone(), || async {
                Err(PlotServeError::Generation {
                    detail: "boom".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PlotServeError::Generation { .. }));
        assert!(!cache.contains(&key));

        // A later caller retries and succeeds.
        let dataset = cache
            .get_or_create(key.clone(), || build(key.clone()))
            .await
            .unwrap();
        assert_eq!(100, dataset.len());
        assert!(cache.contains(&key));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn clear_during_build_does_not_corrupt() {
        let cache = Arc::new(DatasetCache::new(4));
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let key = volcano_key(100);

        let builder = {
            let cache = Arc::clone(&cache);
            let key = key.clone();
            tokio::spawn(async move {
                cache
                    .get_or_create(key.clone(), move || async move {
                        release_rx.await.ok();
                        Ok(generate::generate(&key))
                    })
                    .await
                    .unwrap()
            })
        };

        // Wait for the build to register, then clear the index from under it.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(1, cache.clear());
        release_tx.send(()).unwrap();

        // The detached build still completes for its waiter.
        let dataset = builder.await.unwrap();
        assert_eq!(100, dataset.len());
        assert_eq!(0, cache.status().total_entries);
    }

    #[tokio::test]
    async fn status_reports_keys_and_size() {
        let cache = DatasetCache::new(8);
        for size in [100, 200] {
            let key = volcano_key(size);
            cache
                .get_or_create(key.clone(), || build(key.clone()))
                .await
                .unwrap();
        }
        let status = cache.status();
        assert_eq!(2, status.total_entries);
        assert_eq!(
            vec!["volcano:100:42".to_string(), "volcano:200:42".to_string()],
            status.keys
        );
        assert!(status.total_size_bytes_estimate > 0);
    }
}
