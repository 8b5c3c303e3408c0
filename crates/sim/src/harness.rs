//! Reference harness: per-CPU execution slots, process scripts and pending
//! I/O.
//!
//! The scheduler calls [`Harness::dispatch`] and [`Harness::force_preempt`];
//! both only update a CPU slot. The CPU and I/O threads in
//! [`crate::simulation`] read the slots and turn them into scheduler events.
//! No harness lock is held while calling into the scheduler.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::trace;

use ossim_scheduler::{CpuId, Harness, Pid, ProcessRef, Quantum};

use crate::workload::{Script, Step};

#[derive(Debug, Default)]
struct CpuSlot {
    running: Option<ProcessRef>,
    /// Ticks left in the current quantum; `None` when unbounded.
    quantum_left: Option<u32>,
    preempt_requested: bool,
}

/// What a CPU thread should do next.
#[derive(Debug)]
pub(crate) enum CpuAction {
    /// Nothing dispatched: enter the scheduler's idle path.
    Idle,
    /// A forced preemption is pending for the running process.
    Preempt,
    /// Run this process for one tick.
    Run(ProcessRef),
}

#[derive(Debug)]
struct PendingIo {
    process: ProcessRef,
    ticks_left: u32,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Harness state shared by the CPU threads and the I/O thread.
#[derive(Debug)]
pub struct SimHarness {
    cpus: Vec<Mutex<CpuSlot>>,
    scripts: Mutex<HashMap<Pid, Script>>,
    io: Mutex<Vec<PendingIo>>,
    busy_ticks: Vec<AtomicU64>,
    io_ticks: AtomicU64,
    terminated: AtomicUsize,
}

impl SimHarness {
    pub(crate) fn new(cpu_count: usize, scripts: HashMap<Pid, Script>) -> Self {
        Self {
            cpus: (0..cpu_count).map(|_| Mutex::new(CpuSlot::default())).collect(),
            scripts: Mutex::new(scripts),
            io: Mutex::new(Vec::new()),
            busy_ticks: (0..cpu_count).map(|_| AtomicU64::new(0)).collect(),
            io_ticks: AtomicU64::new(0),
            terminated: AtomicUsize::new(0),
        }
    }

    /// Read the slot for `cpu` and decide the next step. Consumes a pending
    /// forced preemption.
    pub(crate) fn next_action(&self, cpu: CpuId) -> CpuAction {
        let mut slot = lock(&self.cpus[cpu]);
        let Some(process) = slot.running.clone() else {
            return CpuAction::Idle;
        };
        if slot.preempt_requested {
            slot.preempt_requested = false;
            return CpuAction::Preempt;
        }
        CpuAction::Run(process)
    }

    /// Charge one tick of CPU time to `process` running on `cpu`.
    pub(crate) fn run_tick(&self, cpu: CpuId, process: &ProcessRef) -> Step {
        self.busy_ticks[cpu].fetch_add(1, Ordering::Relaxed);
        process.consume(1);
        let step = lock(&self.scripts)
            .get_mut(&process.pid())
            .map(Script::run_tick)
            .unwrap_or(Step::Done);
        trace!(cpu, pid = %process.pid(), ?step, "tick");
        step
    }

    /// Count one tick against the quantum of `cpu`. Returns `true` when
    /// the quantum is used up.
    pub(crate) fn quantum_expired(&self, cpu: CpuId) -> bool {
        let mut slot = lock(&self.cpus[cpu]);
        match slot.quantum_left.as_mut() {
            Some(left) => {
                *left = left.saturating_sub(1);
                *left == 0
            }
            None => false,
        }
    }

    /// Put `process` to sleep on I/O for `ticks`.
    pub(crate) fn start_io(&self, process: ProcessRef, ticks: u32) {
        lock(&self.io).push(PendingIo {
            process,
            ticks_left: ticks,
        });
    }

    /// Advance every pending I/O by one tick; return the processes whose
    /// I/O completed, in the order they started.
    pub(crate) fn advance_io(&self) -> Vec<ProcessRef> {
        let mut io = lock(&self.io);
        if io.is_empty() {
            return Vec::new();
        }
        self.io_ticks.fetch_add(1, Ordering::Relaxed);
        let mut done = Vec::new();
        io.retain_mut(|pending| {
            pending.ticks_left = pending.ticks_left.saturating_sub(1);
            if pending.ticks_left == 0 {
                done.push(pending.process.clone());
                false
            } else {
                true
            }
        });
        done
    }

    /// Record a termination; returns how many processes have terminated.
    pub(crate) fn mark_terminated(&self, pid: Pid) -> usize {
        lock(&self.scripts).remove(&pid);
        self.terminated.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn terminated(&self) -> usize {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn busy_ticks(&self) -> Vec<u64> {
        self.busy_ticks.iter().map(|t| t.load(Ordering::Relaxed)).collect()
    }

    pub fn io_ticks(&self) -> u64 {
        self.io_ticks.load(Ordering::Relaxed)
    }
}

impl Harness for SimHarness {
    fn dispatch(&self, cpu: CpuId, process: Option<ProcessRef>, quantum: Quantum) {
        let mut slot = lock(&self.cpus[cpu]);
        slot.running = process;
        slot.quantum_left = quantum.ticks();
        slot.preempt_requested = false;
    }

    fn force_preempt(&self, cpu: CpuId) {
        let mut slot = lock(&self.cpus[cpu]);
        // the cpu may have gone idle since the scheduler looked
        if slot.running.is_some() {
            slot.preempt_requested = true;
        }
    }
}
