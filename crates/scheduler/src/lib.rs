//! Concurrent CPU scheduler core for a simulated multi-core machine.
//!
//! One worker thread per simulated CPU delivers events ([`Scheduler::idle`],
//! [`Scheduler::preempt`], [`Scheduler::yield_cpu`], [`Scheduler::terminate`])
//! and the harness delivers I/O completions through [`Scheduler::wake_up`].
//! The core keeps a single [`ReadyPool`] and a [`DispatchRegistry`] and calls
//! back into the [`Harness`] to switch what a CPU runs.

pub mod config;
pub mod error;
pub mod harness;
pub mod metrics;
pub mod policy;
pub mod pool;
pub mod process;
pub mod registry;
pub mod runner;

pub use config::SchedulerConfig;
pub use error::{ConfigError, CpuId, SchedulerError};
pub use harness::Harness;
pub use metrics::SchedulerMetrics;
pub use policy::{Policy, PolicyKind, Quantum};
pub use pool::ReadyPool;
pub use process::{Pid, Process, ProcessRef, ProcessState};
pub use registry::DispatchRegistry;
pub use runner::Scheduler;
