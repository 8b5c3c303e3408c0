use crate::error::CpuId;
use crate::policy::Quantum;
use crate::process::ProcessRef;

/// Callbacks the scheduler core needs from the simulation harness.
///
/// The harness owns the CPU worker threads and delivers their events to
/// [`Scheduler`](crate::Scheduler). Both methods are called from inside
/// scheduler entry points and must only record intent; they must not call
/// back into the scheduler or block.
pub trait Harness: Send + Sync {
    /// Run `process` on `cpu` for `quantum`. `None` selects the idle process.
    fn dispatch(&self, cpu: CpuId, process: Option<ProcessRef>, quantum: Quantum);

    /// Ask `cpu` to raise a preempt event at its next safe point.
    fn force_preempt(&self, cpu: CpuId);
}
