//! Bounded, time-limited caches in front of the tree service.
//!
//! - [`ListingCache`] memoizes the ordered node IDs of a prefix listing
//! - [`NodeCache`] memoizes version nodes by ID
//!
//! Both share [`LruCache`], which evicts the least recently used entry once
//! the capacity is reached and treats entries older than the configured
//! lifetime as absent. Cache operations are local and never block on I/O.

mod listing;
mod node;

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use parking_lot::Mutex;
use tokio::time::Instant;

pub use listing::{CacheError, ListingCache, ListingKey};
pub use node::NodeCache;

use crate::config::CacheConfig;

#[derive(Debug)]
struct Slot<V> {
    value: V,
    inserted: Instant,
    tick: u64,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, Slot<V>>,
    /// Access tick to key; the first entry is the least recently used.
    recency: BTreeMap<u64, K>,
    tick: u64,
}

impl<K: Eq + Hash + Clone, V> Inner<K, V> {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn remove(&mut self, key: &K) -> Option<Slot<V>> {
        let slot = self.entries.remove(key)?;
        self.recency.remove(&slot.tick);
        Some(slot)
    }
}

/// LRU cache with a per-entry lifetime.
#[derive(Debug)]
pub struct LruCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    config: CacheConfig,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// Create an empty cache. A capacity of zero disables caching.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                tick: 0,
            }),
            config,
        }
    }

    /// Capacity and lifetime bounds.
    #[must_use]
    pub fn config(&self) -> CacheConfig {
        self.config
    }

    /// The live value for `key`, marking it most recently used. Expired
    /// entries are dropped and reported as absent.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let expired = inner
            .entries
            .get(key)
            .map(|slot| slot.inserted.elapsed() >= self.config.lifetime)?;
        if expired {
            inner.remove(key);
            return None;
        }

        let tick = inner.next_tick();
        let Inner {
            entries, recency, ..
        } = &mut *inner;
        let slot = entries.get_mut(key)?;
        recency.remove(&slot.tick);
        slot.tick = tick;
        recency.insert(tick, key.clone());
        Some(slot.value.clone())
    }

    /// Insert or replace `key`, evicting least recently used entries beyond
    /// the capacity.
    pub fn insert(&self, key: K, value: V) {
        if self.config.size == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        inner.remove(&key);
        let tick = inner.next_tick();
        inner.recency.insert(tick, key.clone());
        inner.entries.insert(
            key,
            Slot {
                value,
                inserted: Instant::now(),
                tick,
            },
        );

        while inner.entries.len() > self.config.size {
            let Some((_, oldest)) = inner.recency.pop_first() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }

    /// Drop `key`. Returns whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    /// Drop every entry whose key matches `predicate`. Returns how many were
    /// dropped.
    pub fn remove_matching(&self, mut predicate: impl FnMut(&K) -> bool) -> usize {
        let mut inner = self.inner.lock();
        let doomed: Vec<K> = inner
            .entries
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        for key in &doomed {
            inner.remove(key);
        }
        doomed.len()
    }

    /// Number of entries, expired ones included until they are touched.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.recency.clear();
    }
}
