use tracing::{debug, error};

use crate::error::{CpuId, SchedulerError};
use crate::metrics::MetricsCounters;
use crate::process::{ProcessRef, ProcessState};

use super::Scheduler;

impl Scheduler {
    /// Pick the next process for `cpu`, record it and hand it to the harness.
    ///
    /// With nothing READY the CPU gets the idle process and its registry
    /// slot is cleared.
    pub(super) fn schedule(&self, cpu: CpuId) -> Result<Option<ProcessRef>, SchedulerError> {
        let next = self.ready.extract(&self.policy);
        self.install(cpu, next)
    }

    /// Overwrite the registry slot for `cpu` with `next` and dispatch it.
    ///
    /// Whatever the slot held before is replaced in the same registry
    /// operation, so the CPU never shows up as idle during a handoff.
    fn install(
        &self,
        cpu: CpuId,
        next: Option<ProcessRef>,
    ) -> Result<Option<ProcessRef>, SchedulerError> {
        let quantum = self.policy.quantum();

        match &next {
            Some(process) => {
                process.set_state(ProcessState::Running);
                if let Err(e) = self.registry.set(cpu, Some(process.clone())) {
                    error!(cpu, pid = %process.pid(), error = %e, "dispatch invariant violated");
                    return Err(e);
                }
                MetricsCounters::bump(&self.metrics.context_switches);
                debug!(
                    cpu,
                    pid = %process.pid(),
                    time_remaining = process.time_remaining(),
                    quantum = ?quantum.ticks(),
                    "dispatch"
                );
            }
            None => {
                self.registry.set(cpu, None)?;
                MetricsCounters::bump(&self.metrics.idle_dispatches);
                debug!(cpu, "dispatch idle");
            }
        }

        self.harness.dispatch(cpu, next.clone(), quantum);
        Ok(next)
    }

    /// The process running on `cpu`, failing if there is none.
    ///
    /// The slot is left in place; the following dispatch overwrites it.
    fn current_or_err(&self, cpu: CpuId) -> Result<ProcessRef, SchedulerError> {
        match self.registry.get(cpu)? {
            Some(process) => Ok(process),
            None => {
                error!(cpu, "event delivered for a cpu with no running process");
                Err(SchedulerError::NoCurrentProcess(cpu))
            }
        }
    }

    /// The CPU has nothing to run. Blocks until the ready pool is non-empty,
    /// then schedules.
    ///
    /// Returns `Ok(None)` without dispatching once the scheduler is shut
    /// down. Otherwise returns whatever was dispatched; that can still be
    /// `None` if another CPU took the work first.
    pub fn idle(&self, cpu: CpuId) -> Result<Option<ProcessRef>, SchedulerError> {
        self.check_cpu(cpu)?;
        if !self.ready.wait_until_nonempty() {
            debug!(cpu, "ready pool closed, leaving idle");
            return Ok(None);
        }
        self.schedule(cpu)
    }

    /// Timeslice expired (or a forced preemption landed): the running
    /// process goes back to the ready pool.
    ///
    /// It competes with the pool as if appended at the tail. When it still
    /// wins it is dispatched again; otherwise the winner takes over its
    /// registry slot first and only then is it re-queued.
    pub fn preempt(&self, cpu: CpuId) -> Result<Option<ProcessRef>, SchedulerError> {
        self.check_cpu(cpu)?;
        let process = self.current_or_err(cpu)?;
        MetricsCounters::bump(&self.metrics.preemptions);
        debug!(cpu, pid = %process.pid(), time_remaining = process.time_remaining(), "preempt");

        match self.ready.extract_outranking(&self.policy, &process) {
            None => self.install(cpu, Some(process)),
            Some(next) => {
                let dispatched = self.install(cpu, Some(next))?;
                self.ready.insert(process)?;
                Ok(dispatched)
            }
        }
    }

    /// The running process blocked for I/O. It leaves the scheduler until
    /// [`wake_up`](Self::wake_up) brings it back.
    pub fn yield_cpu(&self, cpu: CpuId) -> Result<Option<ProcessRef>, SchedulerError> {
        self.check_cpu(cpu)?;
        let process = self.current_or_err(cpu)?;
        process.set_state(ProcessState::Waiting);
        MetricsCounters::bump(&self.metrics.yields);
        debug!(cpu, pid = %process.pid(), "yield");
        self.schedule(cpu)
    }

    /// The running process finished. The core drops its reference.
    pub fn terminate(&self, cpu: CpuId) -> Result<Option<ProcessRef>, SchedulerError> {
        self.check_cpu(cpu)?;
        let process = self.current_or_err(cpu)?;
        process.set_state(ProcessState::Terminated);
        MetricsCounters::bump(&self.metrics.terminations);
        debug!(cpu, pid = %process.pid(), "terminate");
        self.schedule(cpu)
    }

    /// A process became ready (new arrival or I/O completion).
    ///
    /// Under LRTF this may force one running CPU to give up its process;
    /// the CPU chosen is returned.
    pub fn wake_up(&self, process: ProcessRef) -> Result<Option<CpuId>, SchedulerError> {
        let running_on = self
            .registry
            .snapshot_all()
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|p| p.pid() == process.pid()));
        if let Some(cpu) = running_on {
            error!(cpu, pid = %process.pid(), "wake-up for a running process");
            return Err(SchedulerError::AlreadyDispatched {
                pid: process.pid(),
                cpu,
            });
        }

        MetricsCounters::bump(&self.metrics.wake_ups);
        debug!(pid = %process.pid(), time_remaining = process.time_remaining(), "wake up");
        self.ready.insert(process.clone())?;

        if self.policy.preempts_on_wake() {
            Ok(self.preempt_for(&process))
        } else {
            Ok(None)
        }
    }
}
