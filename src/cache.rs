//! Per-service in-memory cache with lazy TTL expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::clock::{self, Clock};

/// TTLs used by the data services
pub mod ttl {
    use std::time::Duration;

    pub const FLIGHTS: Duration = Duration::from_secs(30 * 60);
    pub const HOTELS: Duration = Duration::from_secs(60 * 60);
    pub const CURRENCY_RATES: Duration = Duration::from_secs(60 * 60);
    pub const CITY_COORDINATES: Duration = Duration::from_secs(24 * 60 * 60);
    pub const COUNTRY_METADATA: Duration = Duration::from_secs(7 * 24 * 60 * 60);
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Key-value cache owned by a single service.
///
/// Expiry is checked on read: an entry older than the TTL is evicted and
/// reported as absent. `sweep_expired` drops all stale entries at once.
/// There is no size bound.
#[derive(Debug)]
pub struct ExpiringCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ExpiringCache<V> {
    /// Create a cache using the tokio clock
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, clock::system())
    }

    #[must_use]
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();

        let Some(entry) = entries.get(key) else {
            tracing::debug!("Key not found");
            return None;
        };

        if now.saturating_duration_since(entry.stored_at) > self.ttl {
            tracing::debug!("Key found but expired");
            entries.remove(key);
            None
        } else {
            tracing::debug!("Key found and still fresh");
            Some(entry.value.clone())
        }
    }

    /// Stores a value, replacing any previous entry and resetting its age.
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub fn set(&self, key: &str, value: V) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        self.lock().insert(key.to_string(), entry);
    }

    /// Removes every entry older than the TTL, returning how many were dropped.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) <= ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!("Swept {} expired cache entries", evicted);
        }
        evicted
    }

    /// Manually removes a key from the cache.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.lock().remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, including ones not yet swept
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use rstest::rstest;

    const EPSILON: Duration = Duration::from_millis(1);

    fn cache_with_clock(ttl: Duration) -> (ExpiringCache<String>, ManualClock) {
        let clock = ManualClock::new();
        let cache = ExpiringCache::with_clock(ttl, Arc::new(clock.clone()));
        (cache, clock)
    }

    #[rstest]
    #[case::flights(ttl::FLIGHTS)]
    #[case::hotels(ttl::HOTELS)]
    #[case::coordinates(ttl::CITY_COORDINATES)]
    #[case::countries(ttl::COUNTRY_METADATA)]
    fn entry_lives_exactly_for_its_ttl(#[case] ttl: Duration) {
        let (cache, clock) = cache_with_clock(ttl);
        cache.set("rome", "cached".to_string());

        clock.advance(ttl - EPSILON);
        assert_eq!(cache.get("rome"), Some("cached".to_string()));

        clock.advance(EPSILON * 2);
        assert_eq!(cache.get("rome"), None);
    }

    #[test]
    fn expired_read_evicts_entry() {
        let (cache, clock) = cache_with_clock(Duration::from_secs(10));
        cache.set("a", "1".to_string());
        assert_eq!(cache.len(), 1);

        clock.advance(Duration::from_secs(11));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn missing_key_is_absent() {
        let (cache, _) = cache_with_clock(Duration::from_secs(10));
        assert!(cache.get("nothing").is_none());
    }

    #[test]
    fn set_resets_entry_age() {
        let (cache, clock) = cache_with_clock(Duration::from_secs(10));
        cache.set("a", "old".to_string());
        clock.advance(Duration::from_secs(8));
        cache.set("a", "new".to_string());
        clock.advance(Duration::from_secs(8));

        assert_eq!(cache.get("a"), Some("new".to_string()));
    }

    #[test]
    fn sweep_drops_only_stale_entries() {
        let (cache, clock) = cache_with_clock(Duration::from_secs(10));
        cache.set("old", "1".to_string());
        clock.advance(Duration::from_secs(6));
        cache.set("fresh", "2".to_string());
        clock.advance(Duration::from_secs(6));

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh"), Some("2".to_string()));
    }

    #[test]
    fn remove_and_clear() {
        let (cache, _) = cache_with_clock(Duration::from_secs(10));
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());

        assert_eq!(cache.remove("a"), Some("1".to_string()));
        assert!(cache.get("a").is_none());
        cache.clear();
        assert!(cache.is_empty());
    }
}
