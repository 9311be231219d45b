//! Transform cache
//!
//! Memoizes line-local geometry keyed by raw stroke content. Entries leave
//! the cache when it grows past its size bound (least recently used first)
//! or when they sit untouched for longer than the TTL. The TTL sweep is
//! lazy: it runs on insert, at most once per TTL period.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use scrivener_config::CacheConfig;
use serde::Serialize;
use tracing::debug;

use crate::types::CoordinateSequence;

struct Entry {
    value: CoordinateSequence,
    last_access: Instant,
}

struct CacheState {
    entries: LruCache<Vec<u8>, Entry>,
    last_sweep: Instant,
}

#[derive(Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    expired: AtomicU64,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    /// Entries dropped for size
    pub evictions: u64,
    /// Entries dropped for age
    pub expired: u64,
}

/// Size- and age-bounded memo of normalized geometry. Safe to share.
pub struct TransformCache {
    state: Mutex<CacheState>,
    max_entries: usize,
    ttl: Duration,
    counters: CacheCounters,
}

impl std::fmt::Debug for TransformCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformCache")
            .field("max_entries", &self.max_entries)
            .field("ttl", &self.ttl)
            .field("stats", &self.stats())
            .finish()
    }
}

impl TransformCache {
    pub fn new(config: &CacheConfig) -> Self {
        let max_entries = config.max_entries.max(1);
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                last_sweep: Instant::now(),
            }),
            max_entries,
            ttl: config.ttl,
            counters: CacheCounters::default(),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<CoordinateSequence> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`, refreshing its recency and access time.
    pub fn get_at(&self, key: &[u8], now: Instant) -> Option<CoordinateSequence> {
        let mut state = self.state.lock();
        let expired = match state.entries.get_mut(key) {
            Some(entry) if now.saturating_duration_since(entry.last_access) <= self.ttl => {
                entry.last_access = now;
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.entries.pop(key);
            self.counters.expired.fetch_add(1, Ordering::Relaxed);
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn insert(&self, key: Vec<u8>, value: CoordinateSequence) {
        self.insert_at(key, value, Instant::now());
    }

    /// Store `value` as of `now`, sweeping stale entries if a TTL period has passed.
    pub fn insert_at(&self, key: Vec<u8>, value: CoordinateSequence, now: Instant) {
        let mut state = self.state.lock();

        if now.saturating_duration_since(state.last_sweep) >= self.ttl {
            let removed = sweep(&mut state.entries, now, self.ttl);
            state.last_sweep = now;
            if removed > 0 {
                self.counters.expired.fetch_add(removed as u64, Ordering::Relaxed);
                debug!("Swept {removed} stale transform cache entries");
            }
        }

        let entry = Entry {
            value,
            last_access: now,
        };
        if let Some((evicted, _)) = state.entries.push(key.clone(), entry) {
            if evicted != key {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.counters.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Return the cached value for `key` or compute and store it.
    ///
    /// `compute` runs without the lock held, so two racing callers may both
    /// compute; the later insert wins. Failures are returned and not cached.
    pub fn get_or_compute<E, F>(&self, key: Vec<u8>, compute: F) -> Result<CoordinateSequence, E>
    where
        F: FnOnce() -> Result<CoordinateSequence, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.state.lock().entries.contains(key)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            insertions: self.counters.insertions.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
        }
    }
}

fn sweep(entries: &mut LruCache<Vec<u8>, Entry>, now: Instant, ttl: Duration) -> usize {
    let stale: Vec<Vec<u8>> = entries
        .iter()
        .filter(|(_, e)| now.saturating_duration_since(e.last_access) > ttl)
        .map(|(k, _)| k.clone())
        .collect();
    for key in &stale {
        entries.pop(key);
    }
    stale.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Coordinate;

    fn cache(max_entries: usize, ttl_secs: u64) -> TransformCache {
        TransformCache::new(&CacheConfig {
            max_entries,
            ttl: Duration::from_secs(ttl_secs),
        })
    }

    fn seq(x: f64) -> CoordinateSequence {
        CoordinateSequence::new(vec![Coordinate::new(x, 0.0, 1.0)])
    }

    #[test]
    fn test_lru_evicts_oldest() {
        let cache = cache(2, 300);
        cache.insert(b"a".to_vec(), seq(1.0));
        cache.insert(b"b".to_vec(), seq(2.0));
        cache.insert(b"c".to_vec(), seq(3.0));

        assert!(!cache.contains(b"a"));
        assert!(cache.contains(b"b"));
        assert!(cache.contains(b"c"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_hit_refreshes_recency() {
        let cache = cache(2, 300);
        cache.insert(b"a".to_vec(), seq(1.0));
        cache.insert(b"b".to_vec(), seq(2.0));
        assert!(cache.get(b"a").is_some());
        cache.insert(b"c".to_vec(), seq(3.0));

        assert!(cache.contains(b"a"));
        assert!(!cache.contains(b"b"));
    }

    #[test]
    fn test_default_capacity_drops_least_recent() {
        use scrivener_config::MAX_CACHE_SIZE;

        let cache = TransformCache::new(&CacheConfig::default());
        let key = |i: usize| format!("line-{i}").into_bytes();
        for i in 0..MAX_CACHE_SIZE {
            cache.insert(key(i), seq(i as f64));
        }
        // touching the oldest entry moves it to the front
        assert!(cache.get(&key(0)).is_some());
        for i in MAX_CACHE_SIZE..MAX_CACHE_SIZE + 3 {
            cache.insert(key(i), seq(i as f64));
        }

        assert_eq!(cache.len(), MAX_CACHE_SIZE);
        let missing: Vec<usize> = (0..MAX_CACHE_SIZE + 3)
            .filter(|&i| !cache.contains(&key(i)))
            .collect();
        assert_eq!(missing, vec![1, 2, 3]);
        assert_eq!(cache.stats().evictions, 3);
    }

    #[test]
    fn test_ttl_expires_on_lookup() {
        let cache = cache(32, 10);
        let start = Instant::now();
        cache.insert_at(b"a".to_vec(), seq(1.0), start);

        assert!(cache.get_at(b"a", start + Duration::from_secs(5)).is_some());
        // access refreshed at +5s, so +14s is still fresh
        assert!(cache.get_at(b"a", start + Duration::from_secs(14)).is_some());
        assert!(cache.get_at(b"a", start + Duration::from_secs(30)).is_none());
        assert_eq!(cache.stats().expired, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_on_insert_independent_of_size() {
        let cache = cache(32, 10);
        let start = Instant::now();
        cache.insert_at(b"a".to_vec(), seq(1.0), start);
        cache.insert_at(b"b".to_vec(), seq(2.0), start + Duration::from_secs(8));

        cache.insert_at(b"c".to_vec(), seq(3.0), start + Duration::from_secs(15));
        assert!(!cache.contains(b"a"));
        assert!(cache.contains(b"b"));
        assert!(cache.contains(b"c"));
    }

    #[test]
    fn test_failed_compute_not_cached() {
        let cache = cache(4, 300);
        let result: Result<_, &str> = cache.get_or_compute(b"k".to_vec(), || Err("boom"));
        assert_eq!(result, Err("boom"));
        assert!(cache.is_empty());

        let value: Result<_, &str> = cache.get_or_compute(b"k".to_vec(), || Ok(seq(4.0)));
        assert_eq!(value.unwrap(), seq(4.0));
        let again: Result<_, &str> = cache.get_or_compute(b"k".to_vec(), || Err("not called"));
        assert_eq!(again.unwrap(), seq(4.0));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.insertions, 1);
    }

    #[test]
    fn test_clear() {
        let cache = cache(4, 300);
        cache.insert(b"a".to_vec(), seq(1.0));
        cache.clear();
        assert!(cache.is_empty());
    }
}
