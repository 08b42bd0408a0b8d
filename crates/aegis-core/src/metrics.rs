//! Process-wide sentinel counters.
//!
//! Incremented silently where things happen; [`Metrics::flush`] emits them
//! all as one `info!` event when the daemon drains.

use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters.
pub static METRICS: Metrics = Metrics::new();

const COUNTERS: usize = 6;

/// One named counter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Requests,
    Verdicts,
    EvaluationFailures,
    ProtocolErrors,
    Denials,
    EvidenceFailures,
}

impl Counter {
    pub const ALL: [Counter; COUNTERS] = [
        Counter::Requests,
        Counter::Verdicts,
        Counter::EvaluationFailures,
        Counter::ProtocolErrors,
        Counter::Denials,
        Counter::EvidenceFailures,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

pub struct Metrics {
    counters: [AtomicU64; COUNTERS],
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            counters: [const { AtomicU64::new(0) }; COUNTERS],
        }
    }

    pub fn inc(&self, counter: Counter) {
        self.counters[counter.slot()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter.slot()].load(Ordering::Relaxed)
    }

    /// Emit every counter as one `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            requests = self.get(Counter::Requests),
            verdicts = self.get(Counter::Verdicts),
            evaluation_failures = self.get(Counter::EvaluationFailures),
            protocol_errors = self.get(Counter::ProtocolErrors),
            denials = self.get(Counter::Denials),
            evidence_failures = self.get(Counter::EvidenceFailures),
        );
    }

    /// Zero every counter (tests share the global).
    pub fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
