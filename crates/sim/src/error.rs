use thiserror::Error;

use ossim_scheduler::{ConfigError, SchedulerError};

/// Errors from building or running a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("scheduler invariant violated: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("invalid workload: {0}")]
    Workload(String),

    #[error("workload parse error: {0}")]
    WorkloadParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker thread {0} panicked")]
    WorkerPanicked(String),
}
