//! Shared pool of READY processes.
//!
//! The pool is an owned sequence kept in insertion order. It has no queue
//! discipline of its own: every extraction asks the active [`Policy`] which
//! entry to remove.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::SchedulerError;
use crate::policy::Policy;
use crate::process::{Pid, ProcessRef, ProcessState};

#[derive(Debug, Default)]
struct PoolInner {
    ready: Vec<ProcessRef>,
    closed: bool,
}

/// Mutex/condvar-protected ready pool.
#[derive(Debug, Default)]
pub struct ReadyPool {
    inner: Mutex<PoolInner>,
    not_empty: Condvar,
}

impl ReadyPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `process` READY and append it, waking every idle waiter.
    ///
    /// The wake is issued with the lock held, so a waiter that has checked
    /// the pool but not yet gone to sleep cannot miss it.
    pub fn insert(&self, process: ProcessRef) -> Result<(), SchedulerError> {
        let mut inner = self.lock();
        if inner.ready.iter().any(|p| p.pid() == process.pid()) {
            return Err(SchedulerError::AlreadyQueued(process.pid()));
        }
        process.set_state(ProcessState::Ready);
        debug!(pid = %process.pid(), depth = inner.ready.len() + 1, "ready pool insert");
        inner.ready.push(process);
        self.not_empty.notify_all();
        Ok(())
    }

    /// Remove and return the process `policy` selects, or `None` when the
    /// pool is empty.
    pub fn extract(&self, policy: &Policy) -> Option<ProcessRef> {
        let mut inner = self.lock();
        let idx = policy.select(&inner.ready)?;
        // `remove` keeps the remaining entries in insertion order
        Some(inner.ready.remove(idx))
    }

    /// Remove the process `policy` would pick if `current` were appended to
    /// the pool, unless that pick is `current` itself.
    ///
    /// `None` means `current` keeps the CPU. `current` is never inserted, so
    /// no other CPU can extract it while it is still registered as running.
    pub fn extract_outranking(&self, policy: &Policy, current: &ProcessRef) -> Option<ProcessRef> {
        let mut inner = self.lock();
        let idx = policy.select(&inner.ready)?;
        let pair = [inner.ready[idx].clone(), current.clone()];
        match policy.select(&pair) {
            Some(0) => Some(inner.ready.remove(idx)),
            _ => None,
        }
    }

    /// Block until the pool holds at least one process.
    ///
    /// Returns `false` once the pool is closed, whether or not processes are
    /// still queued: the run is over and the caller must not schedule.
    pub fn wait_until_nonempty(&self) -> bool {
        let guard = self.lock();
        let guard = self
            .not_empty
            .wait_while(guard, |inner| inner.ready.is_empty() && !inner.closed)
            .unwrap_or_else(PoisonError::into_inner);
        !guard.closed
    }

    /// Close the pool and release every idle waiter.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        self.not_empty.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().ready.is_empty()
    }

    /// Pids currently queued, in insertion order.
    pub fn pids(&self) -> Vec<Pid> {
        self.lock().ready.iter().map(|p| p.pid()).collect()
    }
}
