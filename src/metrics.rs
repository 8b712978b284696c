use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    runs_started: AtomicU64,
    runs_succeeded: AtomicU64,
    runs_failed: AtomicU64,
    invalid_inputs: AtomicU64,
    external_retries: AtomicU64,
    persistence_failures: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an upload that passed validation and entered the pipeline.
    pub fn record_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that produced a summary.
    pub fn record_succeeded(&self) {
        self.runs_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run that ended in failure after validation.
    pub fn record_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an upload rejected before any processing.
    pub fn record_invalid_input(&self) {
        self.invalid_inputs.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one retried external call.
    pub fn record_retry(&self) {
        self.external_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a summary that could not be written to the archive.
    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_succeeded: self.runs_succeeded.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            invalid_inputs: self.invalid_inputs.load(Ordering::Relaxed),
            external_retries: self.external_retries.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Runs that entered the pipeline since startup.
    pub runs_started: u64,
    /// Runs that returned a summary.
    pub runs_succeeded: u64,
    /// Runs that failed after validation.
    pub runs_failed: u64,
    /// Uploads rejected as invalid input.
    pub invalid_inputs: u64,
    /// External calls retried after a transient failure.
    pub external_retries: u64,
    /// Summaries that could not be persisted.
    pub persistence_failures: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_run_outcomes() {
        let metrics = PipelineMetrics::new();
        metrics.record_started();
        metrics.record_started();
        metrics.record_succeeded();
        metrics.record_failed();
        metrics.record_retry();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.runs_started, 2);
        assert_eq!(snapshot.runs_succeeded, 1);
        assert_eq!(snapshot.runs_failed, 1);
        assert_eq!(snapshot.external_retries, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        assert_eq!(PipelineMetrics::new().snapshot(), MetricsSnapshot::default());
    }
}
