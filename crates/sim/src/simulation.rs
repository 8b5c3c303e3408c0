//! Worker bootstrap: one thread per CPU plus an event thread delivering
//! arrivals and I/O completions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use ossim_scheduler::{ConfigError, CpuId, ProcessRef, Scheduler, SchedulerConfig};

use crate::error::SimError;
use crate::harness::{CpuAction, SimHarness};
use crate::report::SimulationReport;
use crate::workload::{Step, Workload};

/// Simulation configuration: the scheduler settings plus the tick length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Wall-clock length of one tick in milliseconds. 0 runs as fast as
    /// possible.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_tick_ms() -> u64 { 1 }

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl SimConfig {
    pub fn new(scheduler: SchedulerConfig, tick_ms: u64) -> Self {
        Self { scheduler, tick_ms }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| SimError::Config(ConfigError::Parse(e)))
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// A configured, validated simulation ready to run.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    workload: Workload,
}

impl Simulation {
    /// Validate everything up front so a bad config never starts a thread.
    pub fn new(config: SimConfig, workload: Workload) -> Result<Self, SimError> {
        config.scheduler.validate()?;
        workload.validate()?;
        Ok(Self { config, workload })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Run until every process has terminated.
    ///
    /// The first scheduler invariant violation on any thread stops the whole
    /// run and is returned.
    pub fn run(&self) -> Result<SimulationReport, SimError> {
        let policy = self.config.scheduler.validate()?;
        let cpu_count = self.config.scheduler.cpu_count;

        let mut scripts = HashMap::new();
        let mut processes = Vec::with_capacity(self.workload.len());
        for (process, script) in self.workload.instantiate() {
            scripts.insert(process.pid(), script);
            processes.push(process);
        }

        let harness = Arc::new(SimHarness::new(cpu_count, scripts));
        let scheduler = Scheduler::with_policy(policy, cpu_count, harness.clone())?;
        let run = RunState {
            scheduler,
            harness,
            tick: self.config.tick(),
            total: processes.len(),
            stop: AtomicBool::new(false),
            first_error: Mutex::new(None),
        };

        info!(%policy, cpu_count, processes = run.total, "simulation starting");
        let started_at = Utc::now();
        let clock = Instant::now();

        thread::scope(|s| {
            let run = &run;
            let mut handles = Vec::with_capacity(cpu_count + 1);
            for cpu in 0..cpu_count {
                let spawned = thread::Builder::new()
                    .name(format!("cpu-{}", cpu))
                    .spawn_scoped(s, move || run.guarded(|| run.cpu_loop(cpu)));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        run.fail(e.into());
                        break;
                    }
                }
            }
            let processes = &processes;
            match thread::Builder::new()
                .name("events".to_string())
                .spawn_scoped(s, move || run.guarded(|| run.event_loop(processes)))
            {
                Ok(handle) => handles.push(handle),
                Err(e) => run.fail(e.into()),
            }

            for handle in handles {
                let name = handle.thread().name().unwrap_or("worker").to_string();
                if handle.join().is_err() {
                    run.fail(SimError::WorkerPanicked(name));
                }
            }
        });

        if let Some(err) = run.take_error() {
            warn!(error = %err, "simulation aborted");
            return Err(err);
        }

        let report = SimulationReport {
            policy: policy.to_string(),
            cpu_count,
            processes: run.total,
            started_at,
            finished_at: Utc::now(),
            wall_time: clock.elapsed(),
            cpu_busy_ticks: run.harness.busy_ticks(),
            io_ticks: run.harness.io_ticks(),
            scheduler: run.scheduler.metrics(),
        };
        info!(
            context_switches = report.scheduler.context_switches,
            busy_ticks = report.total_busy_ticks(),
            "simulation finished"
        );
        Ok(report)
    }
}

/// State shared by every thread of one run.
struct RunState {
    scheduler: Scheduler,
    harness: Arc<SimHarness>,
    tick: Duration,
    total: usize,
    stop: AtomicBool,
    first_error: Mutex<Option<SimError>>,
}

/// Stops the run if the owning thread unwinds.
struct StopOnPanic<'a>(&'a RunState);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.stop();
        }
    }
}

impl RunState {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// End the run and release any CPU waiting in idle.
    fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.scheduler.shutdown();
    }

    fn fail(&self, err: SimError) {
        error!(error = %err, "stopping simulation");
        let mut slot = self
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(err);
        }
        drop(slot);
        self.stop();
    }

    fn take_error(&self) -> Option<SimError> {
        self.first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn guarded(&self, body: impl FnOnce() -> Result<(), SimError>) {
        let _guard = StopOnPanic(self);
        if let Err(e) = body() {
            self.fail(e);
        }
    }

    fn sleep_tick(&self) {
        if self.tick.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(self.tick);
        }
    }

    fn cpu_loop(&self, cpu: CpuId) -> Result<(), SimError> {
        debug!(cpu, "cpu thread started");
        while !self.stopped() {
            match self.harness.next_action(cpu) {
                CpuAction::Idle => {
                    self.scheduler.idle(cpu)?;
                }
                CpuAction::Preempt => {
                    self.scheduler.preempt(cpu)?;
                }
                CpuAction::Run(process) => {
                    self.sleep_tick();
                    match self.harness.run_tick(cpu, &process) {
                        Step::Continue => {
                            if self.harness.quantum_expired(cpu) {
                                self.scheduler.preempt(cpu)?;
                            }
                        }
                        Step::Io(ticks) => {
                            // off the registry before the I/O can complete
                            self.scheduler.yield_cpu(cpu)?;
                            self.harness.start_io(process, ticks);
                        }
                        Step::Done => {
                            self.scheduler.terminate(cpu)?;
                            let done = self.harness.mark_terminated(process.pid());
                            debug!(cpu, pid = %process.pid(), done, total = self.total, "process finished");
                            if done == self.total {
                                info!("all processes terminated");
                                self.stop();
                            }
                        }
                    }
                }
            }
        }
        debug!(cpu, "cpu thread exiting");
        Ok(())
    }

    fn event_loop(&self, arrivals: &[ProcessRef]) -> Result<(), SimError> {
        for process in arrivals {
            self.scheduler.wake_up(process.clone())?;
        }
        while !self.stopped() {
            self.sleep_tick();
            for process in self.harness.advance_io() {
                self.scheduler.wake_up(process)?;
            }
        }
        Ok(())
    }
}
