use thiserror::Error;

use crate::process::Pid;

/// Identifier of a simulated CPU (index into the dispatch registry).
pub type CpuId = usize;

/// Invariant violations raised by the scheduler core.
///
/// None of these are recoverable: each means a process record ended up with
/// two owners or none. The harness is expected to abort the run on the first
/// one it sees.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("cpu {cpu} out of range (cpu count {cpu_count})")]
    UnknownCpu { cpu: CpuId, cpu_count: usize },

    #[error("process {0} is already in the ready pool")]
    AlreadyQueued(Pid),

    #[error("process {pid} is already running on cpu {cpu}")]
    AlreadyDispatched { pid: Pid, cpu: CpuId },

    #[error("cpu {0} has no running process")]
    NoCurrentProcess(CpuId),
}

/// Start-up configuration errors. Reported before any worker thread starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown scheduling policy: {0}")]
    UnknownPolicy(String),

    #[error("cpu count must be at least 1")]
    ZeroCpus,

    #[error("round-robin requires a timeslice")]
    MissingTimeslice,

    #[error("timeslice must be at least 1 tick")]
    ZeroTimeslice,

    #[error("timeslice given for non-preemptive policy {0}")]
    UnexpectedTimeslice(String),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
}
