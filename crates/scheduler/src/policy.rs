use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::process::ProcessRef;

/// How long a dispatched process may run before the harness raises a
/// preempt event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quantum {
    /// Run until the process yields or terminates.
    Unbounded,
    /// Run for at most this many ticks.
    Ticks(NonZeroU32),
}

impl Quantum {
    /// Tick limit, or `None` when unbounded.
    pub fn ticks(self) -> Option<u32> {
        match self {
            Quantum::Unbounded => None,
            Quantum::Ticks(n) => Some(n.get()),
        }
    }
}

/// Scheduling policy name as written in configuration, before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    Fifo,
    #[serde(alias = "rr")]
    RoundRobin,
    Lrtf,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PolicyKind::Fifo => "fifo",
            PolicyKind::RoundRobin => "round-robin",
            PolicyKind::Lrtf => "lrtf",
        };
        f.write_str(s)
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" | "f" => Ok(PolicyKind::Fifo),
            "rr" | "round-robin" | "r" => Ok(PolicyKind::RoundRobin),
            "lrtf" | "l" => Ok(PolicyKind::Lrtf),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Active scheduling policy, fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Policy {
    /// Oldest inserted first, runs to completion or yield.
    Fifo,
    /// FIFO selection with a fixed timeslice.
    RoundRobin { timeslice: NonZeroU32 },
    /// Longest remaining time first.
    Lrtf,
}

impl Policy {
    /// Pick the index of the next process to run from `ready`, which is in
    /// insertion order. Returns `None` only when `ready` is empty.
    pub fn select(&self, ready: &[ProcessRef]) -> Option<usize> {
        match self {
            Policy::Fifo | Policy::RoundRobin { .. } => {
                if ready.is_empty() {
                    None
                } else {
                    Some(0)
                }
            }
            Policy::Lrtf => {
                let mut best: Option<(usize, u32)> = None;
                for (idx, p) in ready.iter().enumerate() {
                    let remaining = p.time_remaining();
                    // strict comparison keeps the earliest inserted on ties
                    match best {
                        Some((_, top)) if remaining <= top => {}
                        _ => best = Some((idx, remaining)),
                    }
                }
                best.map(|(idx, _)| idx)
            }
        }
    }

    /// Quantum handed to the harness on every dispatch.
    pub fn quantum(&self) -> Quantum {
        match self {
            Policy::RoundRobin { timeslice } => Quantum::Ticks(*timeslice),
            Policy::Fifo | Policy::Lrtf => Quantum::Unbounded,
        }
    }

    /// Whether a wake-up may force a running CPU off its process.
    pub fn preempts_on_wake(&self) -> bool {
        matches!(self, Policy::Lrtf)
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Policy::Fifo => PolicyKind::Fifo,
            Policy::RoundRobin { .. } => PolicyKind::RoundRobin,
            Policy::Lrtf => PolicyKind::Lrtf,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::RoundRobin { timeslice } => write!(f, "round-robin(timeslice={})", timeslice),
            other => write!(f, "{}", other.kind()),
        }
    }
}
