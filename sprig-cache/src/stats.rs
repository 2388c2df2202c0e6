//! Cache usage counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics about cache usage since construction or the last reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Children requests served from the children cache.
    pub children_hits: u64,
    /// Children requests that dispatched a fetch.
    pub children_misses: u64,
    /// Children requests that joined another caller's in-flight fetch.
    pub children_joins: u64,
    /// Entity ids served from a hydration tier.
    pub entity_hits: u64,
    /// Entity ids that had to be fetched.
    pub entity_misses: u64,
    /// Gateway calls dispatched, of any kind.
    pub network_calls: u64,
    /// Failed operations (each also produced one notification).
    pub failures: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0) across children and entity lookups.
    /// Joins count as hits since they cost no extra network call.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.children_hits + self.children_joins + self.entity_hits;
        let total = hits + self.children_misses + self.entity_misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == CacheStats::default()
    }
}

#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    children_hits: AtomicU64,
    children_misses: AtomicU64,
    children_joins: AtomicU64,
    entity_hits: AtomicU64,
    entity_misses: AtomicU64,
    network_calls: AtomicU64,
    failures: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn children_hit(&self) {
        self.children_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn children_miss(&self) {
        self.children_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn children_join(&self) {
        self.children_joins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn entity_hits(&self, n: u64) {
        self.entity_hits.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn entity_misses(&self, n: u64) {
        self.entity_misses.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn network_call(&self) {
        self.network_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            children_hits: self.children_hits.load(Ordering::Relaxed),
            children_misses: self.children_misses.load(Ordering::Relaxed),
            children_joins: self.children_joins.load(Ordering::Relaxed),
            entity_hits: self.entity_hits.load(Ordering::Relaxed),
            entity_misses: self.entity_misses.load(Ordering::Relaxed),
            network_calls: self.network_calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.children_hits,
            &self.children_misses,
            &self.children_joins,
            &self.entity_hits,
            &self.entity_misses,
            &self.network_calls,
            &self.failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            children_hits: 6,
            children_joins: 2,
            children_misses: 1,
            entity_misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_counters_reset_to_zero() {
        let counters = CacheCounters::default();
        counters.children_hit();
        counters.entity_misses(3);
        counters.network_call();
        counters.failure();
        assert!(!counters.snapshot().is_zero());

        counters.reset();
        assert!(counters.snapshot().is_zero());
    }
}
