use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a process as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ProcessState {
    /// Eligible to run, waiting in the ready pool.
    Ready = 0,
    /// Assigned to a CPU slot.
    Running = 1,
    /// Blocked on I/O, invisible to the scheduler until woken.
    Waiting = 2,
    /// Finished; the core drops its reference.
    Terminated = 3,
}

impl ProcessState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ProcessState::Ready,
            1 => ProcessState::Running,
            2 => ProcessState::Waiting,
            _ => ProcessState::Terminated,
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Waiting => "WAITING",
            ProcessState::Terminated => "TERMINATED",
        };
        f.write_str(s)
    }
}

/// One schedulable unit of work.
///
/// Records are created by whoever generates the workload and handed to the
/// core through [`Scheduler::wake_up`](crate::Scheduler::wake_up). The core
/// only moves the shared handle between the ready pool and the dispatch
/// registry; it never creates or destroys a record.
///
/// `state` and `time_remaining` are atomics so a record needs no lock of its
/// own. Only the current owner writes them.
#[derive(Debug)]
pub struct Process {
    pid: Pid,
    name: String,
    state: AtomicU8,
    time_remaining: AtomicU32,
}

/// Shared handle to a process record.
pub type ProcessRef = Arc<Process>;

impl Process {
    /// Create a new record. It starts out WAITING until its first wake-up.
    pub fn new(pid: Pid, name: impl Into<String>, time_remaining: u32) -> Self {
        Self {
            pid,
            name: name.into(),
            state: AtomicU8::new(ProcessState::Waiting as u8),
            time_remaining: AtomicU32::new(time_remaining),
        }
    }

    /// Convenience constructor returning a shared handle.
    pub fn shared(pid: Pid, name: impl Into<String>, time_remaining: u32) -> ProcessRef {
        Arc::new(Self::new(pid, name, time_remaining))
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ProcessState {
        ProcessState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ProcessState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Estimated CPU time left, in ticks.
    pub fn time_remaining(&self) -> u32 {
        self.time_remaining.load(Ordering::Acquire)
    }

    /// Charge `ticks` of CPU time to the process. Saturates at zero.
    ///
    /// Called by the harness while the process runs; the core only reads.
    pub fn consume(&self, ticks: u32) -> u32 {
        let prev = self
            .time_remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_sub(ticks))
            })
            .unwrap_or_else(|t| t);
        prev.saturating_sub(ticks)
    }
}
