use tracing::debug;

use crate::error::CpuId;
use crate::metrics::MetricsCounters;
use crate::process::Process;

use super::Scheduler;

impl Scheduler {
    /// Decide whether `woken` should displace a running process.
    ///
    /// Takes no action while any CPU is idle: that CPU will pick `woken` up
    /// on its own. Otherwise the CPU running the process with the least time
    /// remaining is forced off, but only if it has strictly less than
    /// `woken`. At most one CPU is preempted per call.
    pub(super) fn preempt_for(&self, woken: &Process) -> Option<CpuId> {
        let remaining = woken.time_remaining();
        let mut lowest: Option<(CpuId, u32)> = None;

        for (cpu, slot) in self.registry.snapshot_all().iter().enumerate() {
            let Some(running) = slot else {
                debug!(cpu, pid = %woken.pid(), "idle cpu present, no forced preemption");
                return None;
            };
            let t = running.time_remaining();
            if lowest.map_or(true, |(_, low)| t < low) {
                lowest = Some((cpu, t));
            }
        }

        let (cpu, low) = lowest?;
        if low >= remaining {
            return None;
        }

        debug!(cpu, pid = %woken.pid(), victim_remaining = low, remaining, "force preempt");
        MetricsCounters::bump(&self.metrics.forced_preemptions);
        self.harness.force_preempt(cpu);
        Some(cpu)
    }
}
