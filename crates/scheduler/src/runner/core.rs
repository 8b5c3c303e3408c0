use std::sync::Arc;

use tracing::info;

use crate::config::SchedulerConfig;
use crate::error::{ConfigError, CpuId, SchedulerError};
use crate::harness::Harness;
use crate::metrics::{MetricsCounters, SchedulerMetrics};
use crate::policy::Policy;
use crate::pool::ReadyPool;
use crate::process::{Pid, ProcessRef};
use crate::registry::DispatchRegistry;

/// The CPU scheduler. One instance per simulation run, shared by every CPU
/// worker thread and the harness event thread.
pub struct Scheduler {
    /// Active policy, fixed for the run.
    pub(super) policy: Policy,
    /// READY processes.
    pub(super) ready: ReadyPool,
    /// What each CPU runs.
    pub(super) registry: DispatchRegistry,
    /// Context-switch and preemption callbacks.
    pub(super) harness: Arc<dyn Harness>,
    pub(super) metrics: MetricsCounters,
}

impl Scheduler {
    /// Validate `config` and build a scheduler around `harness`.
    pub fn new(config: &SchedulerConfig, harness: Arc<dyn Harness>) -> Result<Self, ConfigError> {
        let policy = config.validate()?;
        Self::with_policy(policy, config.cpu_count, harness)
    }

    /// Build a scheduler from an already resolved policy.
    pub fn with_policy(
        policy: Policy,
        cpu_count: usize,
        harness: Arc<dyn Harness>,
    ) -> Result<Self, ConfigError> {
        if cpu_count == 0 {
            return Err(ConfigError::ZeroCpus);
        }
        info!(%policy, cpu_count, "scheduler created");
        Ok(Self {
            policy,
            ready: ReadyPool::new(),
            registry: DispatchRegistry::new(cpu_count),
            harness,
            metrics: MetricsCounters::default(),
        })
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn cpu_count(&self) -> usize {
        self.registry.cpu_count()
    }

    /// Process currently registered on `cpu`.
    pub fn current(&self, cpu: CpuId) -> Result<Option<ProcessRef>, SchedulerError> {
        self.registry.get(cpu)
    }

    /// Number of READY processes.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Pids in the ready pool, in insertion order.
    pub fn ready_pids(&self) -> Vec<Pid> {
        self.ready.pids()
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics.snapshot()
    }

    /// End the run: idle CPUs stop waiting and `idle` returns `Ok(None)`
    /// without scheduling from now on, even if processes are still queued.
    pub fn shutdown(&self) {
        info!("scheduler shutdown requested");
        self.ready.close();
    }

    pub fn is_shutdown(&self) -> bool {
        self.ready.is_closed()
    }

    pub(super) fn check_cpu(&self, cpu: CpuId) -> Result<(), SchedulerError> {
        if cpu >= self.cpu_count() {
            return Err(SchedulerError::UnknownCpu {
                cpu,
                cpu_count: self.cpu_count(),
            });
        }
        Ok(())
    }
}
