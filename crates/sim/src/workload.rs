//! Process scripts fed to the simulation.

use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ossim_scheduler::{Pid, Process, ProcessRef};

use crate::error::SimError;

/// One phase of a process script, in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Burst {
    Cpu(u32),
    Io(u32),
}

impl Burst {
    fn ticks(self) -> u32 {
        match self {
            Burst::Cpu(t) | Burst::Io(t) => t,
        }
    }
}

/// A process as described in the workload: alternating CPU and I/O bursts,
/// starting and ending on the CPU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub name: String,
    pub bursts: Vec<Burst>,
}

impl ProcessSpec {
    pub fn new(name: impl Into<String>, bursts: Vec<Burst>) -> Self {
        Self {
            name: name.into(),
            bursts,
        }
    }

    /// Total CPU ticks the script needs.
    pub fn cpu_ticks(&self) -> u32 {
        self.bursts
            .iter()
            .filter_map(|b| match b {
                Burst::Cpu(t) => Some(*t),
                Burst::Io(_) => None,
            })
            .sum()
    }

    fn validate(&self) -> Result<(), SimError> {
        let invalid = |msg: &str| SimError::Workload(format!("process {}: {}", self.name, msg));

        match (self.bursts.first(), self.bursts.last()) {
            (Some(Burst::Cpu(_)), Some(Burst::Cpu(_))) => {}
            (None, _) => return Err(invalid("no bursts")),
            _ => return Err(invalid("must start and end with a cpu burst")),
        }
        if self.bursts.iter().any(|b| b.ticks() == 0) {
            return Err(invalid("zero-length burst"));
        }
        let same_kind = self.bursts.windows(2).any(|w| {
            matches!(
                (w[0], w[1]),
                (Burst::Cpu(_), Burst::Cpu(_)) | (Burst::Io(_), Burst::Io(_))
            )
        });
        if same_kind {
            return Err(invalid("adjacent bursts of the same kind"));
        }
        Ok(())
    }
}

/// The full set of processes for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    #[serde(rename = "process")]
    pub processes: Vec<ProcessSpec>,
}

impl Default for Workload {
    /// A mix of I/O-bound and CPU-bound processes.
    fn default() -> Self {
        use Burst::{Cpu, Io};
        Self {
            processes: vec![
                ProcessSpec::new("shell", vec![Cpu(1), Io(4), Cpu(1), Io(4), Cpu(1)]),
                ProcessSpec::new("editor", vec![Cpu(2), Io(6), Cpu(1), Io(6), Cpu(2)]),
                ProcessSpec::new("webserver", vec![Cpu(2), Io(3), Cpu(2), Io(3), Cpu(2), Io(3), Cpu(1)]),
                ProcessSpec::new("clock", vec![Cpu(1), Io(8), Cpu(1), Io(8), Cpu(1)]),
                ProcessSpec::new("compiler", vec![Cpu(9), Io(2), Cpu(7)]),
                ProcessSpec::new("database", vec![Cpu(4), Io(5), Cpu(4), Io(5), Cpu(3)]),
                ProcessSpec::new("render", vec![Cpu(14)]),
                ProcessSpec::new("backup", vec![Cpu(3), Io(10), Cpu(5)]),
            ],
        }
    }
}

impl Workload {
    pub fn new(processes: Vec<ProcessSpec>) -> Self {
        Self { processes }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, SimError> {
        let workload: Workload = toml::from_str(s)?;
        workload.validate()?;
        Ok(workload)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if self.processes.is_empty() {
            return Err(SimError::Workload("no processes".to_string()));
        }
        self.processes.iter().try_for_each(ProcessSpec::validate)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Build a process record and its runtime script for every entry.
    /// Pids are assigned in workload order starting at 0.
    pub(crate) fn instantiate(&self) -> Vec<(ProcessRef, Script)> {
        self.processes
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let process = Process::shared(Pid(i as u32), spec.name.clone(), spec.cpu_ticks());
                (process, Script::new(&spec.bursts))
            })
            .collect()
    }
}

/// What happened after a process ran for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Still inside its CPU burst.
    Continue,
    /// CPU burst over, now blocks on I/O for this many ticks.
    Io(u32),
    /// Script finished.
    Done,
}

/// Remaining bursts of a running process.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    bursts: VecDeque<Burst>,
}

impl Script {
    fn new(bursts: &[Burst]) -> Self {
        Self {
            bursts: bursts.iter().copied().collect(),
        }
    }

    /// Charge one CPU tick to the current burst.
    pub fn run_tick(&mut self) -> Step {
        match self.bursts.front_mut() {
            Some(Burst::Cpu(left)) if *left > 1 => {
                *left -= 1;
                return Step::Continue;
            }
            Some(Burst::Cpu(_)) => {}
            // a validated script is never on I/O or empty while running
            Some(Burst::Io(_)) | None => return Step::Done,
        }
        self.bursts.pop_front();
        match self.bursts.pop_front() {
            Some(Burst::Io(ticks)) => Step::Io(ticks),
            Some(cpu @ Burst::Cpu(_)) => {
                self.bursts.push_front(cpu);
                Step::Continue
            }
            None => Step::Done,
        }
    }
}
