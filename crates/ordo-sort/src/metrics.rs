//! Metrics for the ordering engine.
//!
//! Recorded through the `metrics` crate facade; the embedding application
//! decides whether and where to export them.
//!
//! ## Metrics Exported
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `ordo_sort_commands_total` | Counter | `partition` | Commands sorted, by partition |
//! | `ordo_sort_cycles_total` | Counter | - | Dependency cycles collapsed |
//! | `ordo_sort_duration_seconds` | Histogram | - | Time spent in one sort call |
//! | `ordo_comment_removal_fallbacks_total` | Counter | - | Texts returned unscanned |
//! | `ordo_rollback_detections_total` | Counter | `result` | Rollback checks by outcome |
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ordo_sort::metrics::SortMetrics;
//!
//! let metrics = SortMetrics::new();
//! metrics.record_commands("add", 12);
//! metrics.record_cycle();
//! ```

use std::time::{Duration, Instant};

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    /// Counter: Commands sorted, by partition.
    pub const SORT_COMMANDS_TOTAL: &str = "ordo_sort_commands_total";
    /// Counter: Dependency cycles collapsed into one orderable unit.
    pub const SORT_CYCLES_TOTAL: &str = "ordo_sort_cycles_total";
    /// Histogram: Duration of one sort call in seconds.
    pub const SORT_DURATION_SECONDS: &str = "ordo_sort_duration_seconds";
    /// Counter: Comment removal fell back to the original text.
    pub const COMMENT_REMOVAL_FALLBACKS_TOTAL: &str = "ordo_comment_removal_fallbacks_total";
    /// Counter: Rollback checks by outcome.
    pub const ROLLBACK_DETECTIONS_TOTAL: &str = "ordo_rollback_detections_total";
}

/// Label keys used across metrics.
pub mod labels {
    /// Command partition (drop, add, `static_data`).
    pub const PARTITION: &str = "partition";
    /// Detection outcome (rollback, forward).
    pub const RESULT: &str = "result";
}

/// Partition label values.
pub mod partitions {
    /// Drop commands.
    pub const DROP: &str = "drop";
    /// Add and alter commands.
    pub const ADD: &str = "add";
    /// Static data commands.
    pub const STATIC_DATA: &str = "static_data";
}

/// High-level interface for recording ordering metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortMetrics;

impl SortMetrics {
    /// Creates a new metrics recorder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Records the number of commands sorted in one partition.
    pub fn record_commands(&self, partition: &'static str, count: usize) {
        counter!(names::SORT_COMMANDS_TOTAL, labels::PARTITION => partition)
            .increment(u64::try_from(count).unwrap_or(u64::MAX));
    }

    /// Records one collapsed dependency cycle.
    pub fn record_cycle(&self) {
        counter!(names::SORT_CYCLES_TOTAL).increment(1);
    }

    /// Records the duration of one sort call.
    pub fn observe_sort_duration(&self, duration: Duration) {
        histogram!(names::SORT_DURATION_SECONDS).record(duration.as_secs_f64());
    }

    /// Records a comment removal that returned the original text.
    pub fn record_comment_fallback(&self) {
        counter!(names::COMMENT_REMOVAL_FALLBACKS_TOTAL).increment(1);
    }

    /// Records the outcome of a rollback check.
    pub fn record_rollback_detection(&self, rollback: bool) {
        let result = if rollback { "rollback" } else { "forward" };
        counter!(names::ROLLBACK_DETECTIONS_TOTAL, labels::RESULT => result).increment(1);
    }
}

/// Guard that measures elapsed time and records it on drop.
///
/// ## Example
///
/// ```rust
/// use ordo_sort::metrics::TimingGuard;
///
/// fn sort_batch() {
///     let _guard = TimingGuard::new(|duration| {
///         println!("sort took {:?}", duration);
///     });
///     // ... ordering work ...
/// } // Duration recorded here
/// ```
pub struct TimingGuard<F>
where
    F: FnOnce(Duration),
{
    start: Instant,
    on_drop: Option<F>,
}

impl<F> TimingGuard<F>
where
    F: FnOnce(Duration),
{
    /// Creates a new timing guard that will call `on_drop` with the elapsed duration.
    pub fn new(on_drop: F) -> Self {
        Self {
            start: Instant::now(),
            on_drop: Some(on_drop),
        }
    }

    /// Returns the elapsed time since the guard was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl<F> Drop for TimingGuard<F>
where
    F: FnOnce(Duration),
{
    fn drop(&mut self) {
        if let Some(f) = self.on_drop.take() {
            f(self.start.elapsed());
        }
    }
}

/// Creates a timing guard that records the sort duration histogram.
pub fn time_sort(metrics: SortMetrics) -> TimingGuard<impl FnOnce(Duration)> {
    TimingGuard::new(move |duration| metrics.observe_sort_duration(duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn sort_metrics_record_without_recorder() {
        let metrics = SortMetrics::new();
        metrics.record_commands(partitions::ADD, 3);
        metrics.record_cycle();
        metrics.record_comment_fallback();
        metrics.record_rollback_detection(true);
        metrics.observe_sort_duration(Duration::from_millis(4));
    }

    #[test]
    fn timing_guard_calls_back_on_drop() {
        let called = Arc::new(AtomicBool::new(false));
        {
            let called = Arc::clone(&called);
            let _guard = TimingGuard::new(move |_| called.store(true, Ordering::SeqCst));
        }
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn time_sort_guard_reports_elapsed() {
        let guard = time_sort(SortMetrics::new());
        assert!(guard.elapsed() < Duration::from_secs(60));
    }
}
