//! Resolution caching.
//!
//! This module provides [`ResolutionCache`] — an LRU cache that avoids
//! repeated partial-route walks for hot routes. It is gated behind the
//! `cache` feature flag and uses the [`lru`] crate internally.
//!
//! The routing table is immutable after build, so cached resolutions never
//! go stale; [`clear`](ResolutionCache::clear) exists for hosts that want to
//! bound memory between navigation bursts.
//!
//! [`CacheStats`] tracks hits, misses, and invalidations so you can monitor
//! cache effectiveness at runtime.
//!
//! # Examples
//!
//! ```
//! use navigator_core::cache::ResolutionCache;
//!
//! let mut cache = ResolutionCache::new();
//! assert!(cache.get("workspace/home", None).is_none());
//! assert_eq!(cache.stats().misses, 1);
//! ```

use crate::graph::GraphId;
use crate::resolve::Resolution;
use crate::trace_log;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Default number of cached resolutions.
const DEFAULT_CAPACITY: usize = 128;

/// Cache key: the partial route plus the preferred-graph hint it was
/// resolved under (the hint changes the scope order, so it is part of the
/// identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResolutionKey {
    route: String,
    preferred: Option<GraphId>,
}

/// Counters tracking cache hit/miss rates and invalidations.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: usize,
    /// Number of cache misses.
    pub misses: usize,
    /// Number of full cache invalidations (via [`ResolutionCache::clear`]).
    pub invalidations: usize,
}

impl CacheStats {
    /// Return the hit rate as a value in `0.0..=1.0`.
    ///
    /// Returns `0.0` if no lookups have been performed.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU cache for partial-route resolutions.
pub struct ResolutionCache {
    entries: LruCache<ResolutionKey, Resolution>,
    stats: CacheStats,
}

impl ResolutionCache {
    /// Create a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a cache with a specific capacity (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Look up a cached resolution.
    pub fn get(&mut self, route: &str, preferred: Option<&GraphId>) -> Option<Resolution> {
        let key = ResolutionKey {
            route: route.to_string(),
            preferred: preferred.cloned(),
        };
        match self.entries.get(&key) {
            Some(resolution) => {
                self.stats.hits += 1;
                trace_log!("Resolution cache hit for '{}'", route);
                Some(resolution.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Store a resolution.
    pub fn put(&mut self, route: &str, preferred: Option<&GraphId>, resolution: Resolution) {
        let key = ResolutionKey {
            route: route.to_string(),
            preferred: preferred.cloned(),
        };
        self.entries.put(key, resolution);
    }

    /// Drop every cached entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.invalidations += 1;
    }

    /// Current hit/miss counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;
    use crate::graph::Graph;
    use crate::resolve::resolve_route;

    fn sample_resolution() -> Resolution {
        let table = Graph::builder("root")
            .entry(Destination::screen("home"))
            .build()
            .into_table()
            .unwrap();
        resolve_route(&table, "home", None).unwrap()
    }

    #[test]
    fn test_miss_then_hit() {
        let mut cache = ResolutionCache::new();
        assert!(cache.get("home", None).is_none());
        assert_eq!(cache.stats().misses, 1);

        cache.put("home", None, sample_resolution());
        let hit = cache.get("home", None).unwrap();
        assert_eq!(hit.destination.route(), "home");
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_preferred_graph_is_part_of_key() {
        let mut cache = ResolutionCache::new();
        cache.put("home", None, sample_resolution());

        let news: GraphId = "news".into();
        assert!(cache.get("home", Some(&news)).is_none());
        assert!(cache.get("home", None).is_some());
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = ResolutionCache::with_capacity(2);
        cache.put("a", None, sample_resolution());
        cache.put("b", None, sample_resolution());
        cache.put("c", None, sample_resolution());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a", None).is_none());
        assert!(cache.get("c", None).is_some());
    }

    #[test]
    fn test_clear_counts_invalidation() {
        let mut cache = ResolutionCache::new();
        cache.put("a", None, sample_resolution());
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn test_hit_rate() {
        let mut cache = ResolutionCache::new();
        assert_eq!(cache.stats().hit_rate(), 0.0);

        cache.put("a", None, sample_resolution());
        let _ = cache.get("a", None);
        let _ = cache.get("b", None);
        assert!((cache.stats().hit_rate() - 0.5).abs() < f64::EPSILON);
    }
}
