//! Global atomic counters for pipeline step activity.
//!
//! Counters are incremented at the call site. [`Metrics::flush`] emits the
//! current values as a single `tracing::info!` event.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    trials_scanned: AtomicU64,
    arbitrations: AtomicU64,
    challengers_promoted: AtomicU64,
    pipelines_submitted: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            trials_scanned: AtomicU64::new(0),
            arbitrations: AtomicU64::new(0),
            challengers_promoted: AtomicU64::new(0),
            pipelines_submitted: AtomicU64::new(0),
        }
    }

    pub fn add_trials_scanned(&self, n: u64) {
        self.trials_scanned.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "trials_scanned", n = n, "counter incremented");
    }

    pub fn inc_arbitrations(&self) {
        self.arbitrations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "arbitrations", "counter incremented");
    }

    pub fn inc_challengers_promoted(&self) {
        self.challengers_promoted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "challengers_promoted", "counter incremented");
    }

    pub fn inc_pipelines_submitted(&self) {
        self.pipelines_submitted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "pipelines_submitted", "counter incremented");
    }

    /// Emit all counter values as one `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            trials_scanned = self.trials_scanned(),
            arbitrations = self.arbitrations(),
            challengers_promoted = self.challengers_promoted(),
            pipelines_submitted = self.pipelines_submitted(),
        );
    }

    pub fn trials_scanned(&self) -> u64 {
        self.trials_scanned.load(Ordering::Relaxed)
    }

    pub fn arbitrations(&self) -> u64 {
        self.arbitrations.load(Ordering::Relaxed)
    }

    pub fn challengers_promoted(&self) -> u64 {
        self.challengers_promoted.load(Ordering::Relaxed)
    }

    pub fn pipelines_submitted(&self) -> u64 {
        self.pipelines_submitted.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.trials_scanned.store(0, Ordering::Relaxed);
        self.arbitrations.store(0, Ordering::Relaxed);
        self.challengers_promoted.store(0, Ordering::Relaxed);
        self.pipelines_submitted.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.add_trials_scanned(4);
        m.add_trials_scanned(2);
        assert_eq!(m.trials_scanned(), 6);

        m.inc_arbitrations();
        m.inc_challengers_promoted();
        assert_eq!(m.arbitrations(), 1);
        assert_eq!(m.challengers_promoted(), 1);

        m.inc_pipelines_submitted();
        m.inc_pipelines_submitted();
        assert_eq!(m.pipelines_submitted(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.add_trials_scanned(1);
        m.inc_arbitrations();
        m.inc_pipelines_submitted();
        m.reset();
        assert_eq!(m.trials_scanned(), 0);
        assert_eq!(m.arbitrations(), 0);
        assert_eq!(m.pipelines_submitted(), 0);
    }
}
