use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use ossim_scheduler::SchedulerMetrics;

/// Summary of one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Policy the run used, e.g. `round-robin(timeslice=4)`.
    pub policy: String,
    pub cpu_count: usize,
    /// Processes in the workload (all of them terminated).
    pub processes: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub wall_time: Duration,
    /// Ticks each CPU spent running a process.
    pub cpu_busy_ticks: Vec<u64>,
    /// Ticks during which at least one process was blocked on I/O.
    pub io_ticks: u64,
    pub scheduler: SchedulerMetrics,
}

impl SimulationReport {
    /// Total CPU ticks executed across all CPUs.
    pub fn total_busy_ticks(&self) -> u64 {
        self.cpu_busy_ticks.iter().sum()
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Simulation report")?;
        writeln!(f, "Policy:                 {}", self.policy)?;
        writeln!(f, "CPUs:                   {}", self.cpu_count)?;
        writeln!(f, "Processes:              {}", self.processes)?;
        writeln!(f, "Context switches:       {}", self.scheduler.context_switches)?;
        writeln!(f, "Preemptions:            {}", self.scheduler.preemptions)?;
        writeln!(f, "Forced preemptions:     {}", self.scheduler.forced_preemptions)?;
        writeln!(f, "I/O yields:             {}", self.scheduler.yields)?;
        writeln!(f, "Wake-ups:               {}", self.scheduler.wake_ups)?;
        writeln!(f, "Idle dispatches:        {}", self.scheduler.idle_dispatches)?;
        writeln!(f, "Total CPU ticks:        {}", self.total_busy_ticks())?;
        for (cpu, ticks) in self.cpu_busy_ticks.iter().enumerate() {
            writeln!(f, "  cpu {:<3}               {}", cpu, ticks)?;
        }
        writeln!(f, "I/O ticks:              {}", self.io_ticks)?;
        write!(f, "Wall time:              {:.3}s", self.wall_time.as_secs_f64())
    }
}
