//! Injected metrics recorder for cache instrumentation.
//!
//! The cache never owns a metrics registry; it records through whatever
//! implementation the embedder constructs it with. The Prometheus-backed
//! recorder lives in the API crate, keeping this crate free of any
//! metrics-system dependency.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::key::CacheNamespace;

/// Sink for cache operation counters, one count per namespace.
pub trait CacheMetrics: Send + Sync {
    /// A read found an unexpired entry.
    fn record_hit(&self, namespace: CacheNamespace);

    /// A read found nothing - including backend errors folded into misses.
    fn record_miss(&self, namespace: CacheNamespace);

    /// A value was written.
    fn record_write(&self, namespace: CacheNamespace);

    /// A key was evicted.
    fn record_eviction(&self, namespace: CacheNamespace);
}

/// Recorder that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    fn record_hit(&self, _namespace: CacheNamespace) {}
    fn record_miss(&self, _namespace: CacheNamespace) {}
    fn record_write(&self, _namespace: CacheNamespace) {}
    fn record_eviction(&self, _namespace: CacheNamespace) {}
}

/// Atomic per-namespace counters, readable back for assertions.
///
/// Useful both in tests and for embedders that export counters without a
/// metrics system.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    hits: [AtomicU64; 4],
    misses: [AtomicU64; 4],
    writes: [AtomicU64; 4],
    evictions: [AtomicU64; 4],
}

impl CountingMetrics {
    /// Create a recorder with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hits recorded for `namespace`.
    pub fn hits(&self, namespace: CacheNamespace) -> u64 {
        self.hits[namespace.index()].load(Ordering::Relaxed)
    }

    /// Misses recorded for `namespace`.
    pub fn misses(&self, namespace: CacheNamespace) -> u64 {
        self.misses[namespace.index()].load(Ordering::Relaxed)
    }

    /// Writes recorded for `namespace`.
    pub fn writes(&self, namespace: CacheNamespace) -> u64 {
        self.writes[namespace.index()].load(Ordering::Relaxed)
    }

    /// Evictions recorded for `namespace`.
    pub fn evictions(&self, namespace: CacheNamespace) -> u64 {
        self.evictions[namespace.index()].load(Ordering::Relaxed)
    }

    /// Hit rate across all namespaces (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits: u64 = CacheNamespace::ALL.iter().map(|ns| self.hits(*ns)).sum();
        let misses: u64 = CacheNamespace::ALL.iter().map(|ns| self.misses(*ns)).sum();
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

impl CacheMetrics for CountingMetrics {
    fn record_hit(&self, namespace: CacheNamespace) {
        self.hits[namespace.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self, namespace: CacheNamespace) {
        self.misses[namespace.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self, namespace: CacheNamespace) {
        self.writes[namespace.index()].fetch_add(1, Ordering::Relaxed);
    }

    fn record_eviction(&self, namespace: CacheNamespace) {
        self.evictions[namespace.index()].fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_metrics_are_per_namespace() {
        let metrics = CountingMetrics::new();
        metrics.record_hit(CacheNamespace::Task);
        metrics.record_hit(CacheNamespace::Task);
        metrics.record_miss(CacheNamespace::UserTasks);
        metrics.record_write(CacheNamespace::TeamTasks);
        metrics.record_eviction(CacheNamespace::ProjectTasks);

        assert_eq!(metrics.hits(CacheNamespace::Task), 2);
        assert_eq!(metrics.hits(CacheNamespace::UserTasks), 0);
        assert_eq!(metrics.misses(CacheNamespace::UserTasks), 1);
        assert_eq!(metrics.writes(CacheNamespace::TeamTasks), 1);
        assert_eq!(metrics.evictions(CacheNamespace::ProjectTasks), 1);
    }

    #[test]
    fn test_hit_rate() {
        let metrics = CountingMetrics::new();
        assert!((metrics.hit_rate() - 0.0).abs() < 0.001);

        for _ in 0..8 {
            metrics.record_hit(CacheNamespace::Task);
        }
        metrics.record_miss(CacheNamespace::Task);
        metrics.record_miss(CacheNamespace::UserTasks);

        assert!((metrics.hit_rate() - 0.8).abs() < 0.001);
    }
}
