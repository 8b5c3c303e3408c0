use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Event counters, snapshot form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerMetrics {
    /// Dispatches that put a process on a CPU.
    pub context_switches: u64,
    /// Dispatches of the idle process.
    pub idle_dispatches: u64,
    /// Preempt events (timeslice expiry or forced).
    pub preemptions: u64,
    /// `force_preempt` calls issued by the preemption controller.
    pub forced_preemptions: u64,
    pub yields: u64,
    pub terminations: u64,
    pub wake_ups: u64,
}

/// Lock-free counters updated by the scheduler entry points.
#[derive(Debug, Default)]
pub(crate) struct MetricsCounters {
    pub context_switches: AtomicU64,
    pub idle_dispatches: AtomicU64,
    pub preemptions: AtomicU64,
    pub forced_preemptions: AtomicU64,
    pub yields: AtomicU64,
    pub terminations: AtomicU64,
    pub wake_ups: AtomicU64,
}

impl MetricsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SchedulerMetrics {
        SchedulerMetrics {
            context_switches: self.context_switches.load(Ordering::Relaxed),
            idle_dispatches: self.idle_dispatches.load(Ordering::Relaxed),
            preemptions: self.preemptions.load(Ordering::Relaxed),
            forced_preemptions: self.forced_preemptions.load(Ordering::Relaxed),
            yields: self.yields.load(Ordering::Relaxed),
            terminations: self.terminations.load(Ordering::Relaxed),
            wake_ups: self.wake_ups.load(Ordering::Relaxed),
        }
    }
}
