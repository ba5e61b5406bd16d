//! Engine counters.
//!
//! Thread-safe metrics shared between the loop task and external readers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters describing collection-loop behavior.
///
/// Cheap to clone; all clones share the same atomics.
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    cycles_total: AtomicU64,
    cycles_failed: AtomicU64,
    ticks_dropped: AtomicU64,
    last_cycle_us: AtomicU64,
    last_process_count: AtomicU64,
}

impl EngineMetrics {
    /// Creates a new metrics handle with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a completed cycle.
    pub fn record_cycle(&self, duration: Duration, process_count: usize) {
        self.inner.cycles_total.fetch_add(1, Ordering::Relaxed);
        self.inner
            .last_cycle_us
            .store(duration.as_micros() as u64, Ordering::Relaxed);
        self.inner
            .last_process_count
            .store(process_count as u64, Ordering::Relaxed);
    }

    /// Records a failed cycle.
    pub fn record_failure(&self) {
        self.inner.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records ticks dropped because a cycle overran the interval.
    pub fn record_dropped_ticks(&self, count: u64) {
        self.inner.ticks_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// Total successful cycles.
    #[must_use]
    pub fn cycles_total(&self) -> u64 {
        self.inner.cycles_total.load(Ordering::Relaxed)
    }

    /// Total failed cycles.
    #[must_use]
    pub fn cycles_failed(&self) -> u64 {
        self.inner.cycles_failed.load(Ordering::Relaxed)
    }

    /// Total ticks dropped due to overlong cycles.
    #[must_use]
    pub fn ticks_dropped(&self) -> u64 {
        self.inner.ticks_dropped.load(Ordering::Relaxed)
    }

    /// Duration of the most recent successful cycle.
    #[must_use]
    pub fn last_cycle_duration(&self) -> Duration {
        Duration::from_micros(self.inner.last_cycle_us.load(Ordering::Relaxed))
    }

    /// Process count observed by the most recent successful cycle.
    #[must_use]
    pub fn last_process_count(&self) -> u64 {
        self.inner.last_process_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_start_at_zero() {
        let metrics = EngineMetrics::new();
        assert_eq!(metrics.cycles_total(), 0);
        assert_eq!(metrics.cycles_failed(), 0);
        assert_eq!(metrics.ticks_dropped(), 0);
        assert_eq!(metrics.last_process_count(), 0);
    }

    #[test]
    fn test_record_cycle() {
        let metrics = EngineMetrics::new();
        metrics.record_cycle(Duration::from_millis(3), 42);
        metrics.record_cycle(Duration::from_millis(5), 40);
        assert_eq!(metrics.cycles_total(), 2);
        assert_eq!(metrics.last_cycle_duration(), Duration::from_millis(5));
        assert_eq!(metrics.last_process_count(), 40);
    }

    #[test]
    fn test_record_failure_and_drops() {
        let metrics = EngineMetrics::new();
        metrics.record_failure();
        metrics.record_dropped_ticks(3);
        assert_eq!(metrics.cycles_failed(), 1);
        assert_eq!(metrics.ticks_dropped(), 3);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = EngineMetrics::new();
        let clone = metrics.clone();
        clone.record_cycle(Duration::from_millis(1), 1);
        assert_eq!(metrics.cycles_total(), 1);
    }
}
