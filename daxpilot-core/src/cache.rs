//! Single-slot time-to-live cache
//!
//! Used for the workspace list, the Foundry model list and GitHub repository
//! stats. An entry older than the TTL is treated as absent.

use std::time::{Duration, Instant};

/// Default TTL for catalog and stats caches
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    stored_at: Instant,
}

/// Holds at most one value together with the instant it was stored
#[derive(Debug, Clone)]
pub struct TtlCache<T> {
    entry: Option<CacheEntry<T>>,
    ttl: Duration,
}

impl<T> TtlCache<T> {
    /// Create an empty cache
    pub fn new(ttl: Duration) -> Self {
        Self { entry: None, ttl }
    }

    /// Time-to-live of entries
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value, if any
    pub fn get(&self) -> Option<&T> {
        self.get_at(Instant::now())
    }

    /// Fresh value as seen at `now`
    pub fn get_at(&self, now: Instant) -> Option<&T> {
        self.entry
            .as_ref()
            .filter(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)
            .map(|entry| &entry.value)
    }

    /// Store a value, replacing any previous one
    pub fn insert(&mut self, value: T) {
        self.insert_at(value, Instant::now());
    }

    /// Store a value as if it was fetched at `now`
    pub fn insert_at(&mut self, value: T, now: Instant) {
        self.entry = Some(CacheEntry {
            value,
            stored_at: now,
        });
    }

    /// Drop the cached value
    pub fn clear(&mut self) {
        self.entry = None;
    }

    /// Whether a value is stored, fresh or not
    pub fn is_populated(&self) -> bool {
        self.entry.is_some()
    }
}

impl<T> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_within_ttl() {
        let start = Instant::now();
        let mut cache = TtlCache::new(Duration::from_secs(300));
        cache.insert_at(vec!["Sales"], start);

        assert_eq!(
            cache.get_at(start + Duration::from_secs(299)),
            Some(&vec!["Sales"])
        );
    }

    #[test]
    fn test_miss_after_ttl() {
        let start = Instant::now();
        let mut cache = TtlCache::new(Duration::from_secs(300));
        cache.insert_at(1u32, start);

        assert!(cache.get_at(start + Duration::from_secs(300)).is_none());
        assert!(cache.is_populated());
    }

    #[test]
    fn test_clear() {
        let mut cache = TtlCache::default();
        cache.insert("x");
        assert_eq!(cache.get(), Some(&"x"));

        cache.clear();
        assert!(cache.get().is_none());
        assert!(!cache.is_populated());
        assert_eq!(cache.ttl(), DEFAULT_TTL);
    }

    #[test]
    fn test_zero_ttl_never_hits() {
        let mut cache = TtlCache::new(Duration::ZERO);
        cache.insert(42);
        assert!(cache.get().is_none());
    }
}
