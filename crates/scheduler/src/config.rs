use std::num::NonZeroU32;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::policy::{Policy, PolicyKind};

/// Scheduler configuration, typically parsed from TOML or the command line.
///
/// Fixed at start-up. [`SchedulerConfig::validate`] turns it into the
/// [`Policy`] the scheduler runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of simulated CPUs.
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// Scheduling policy.
    #[serde(default)]
    pub policy: PolicyKind,
    /// Round-robin timeslice in ticks. Required for round-robin only.
    #[serde(default)]
    pub timeslice: Option<u32>,
}

fn default_cpu_count() -> usize { 1 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cpu_count: default_cpu_count(),
            policy: PolicyKind::default(),
            timeslice: None,
        }
    }
}

impl SchedulerConfig {
    pub fn new(cpu_count: usize, policy: PolicyKind, timeslice: Option<u32>) -> Self {
        Self {
            cpu_count,
            policy,
            timeslice,
        }
    }

    /// Parse a config from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Load a config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check the config and resolve the policy.
    pub fn validate(&self) -> Result<Policy, ConfigError> {
        if self.cpu_count == 0 {
            return Err(ConfigError::ZeroCpus);
        }
        match self.policy {
            PolicyKind::RoundRobin => {
                let ticks = self.timeslice.ok_or(ConfigError::MissingTimeslice)?;
                let timeslice = NonZeroU32::new(ticks).ok_or(ConfigError::ZeroTimeslice)?;
                Ok(Policy::RoundRobin { timeslice })
            }
            kind if self.timeslice.is_some() => {
                Err(ConfigError::UnexpectedTimeslice(kind.to_string()))
            }
            PolicyKind::Fifo => Ok(Policy::Fifo),
            PolicyKind::Lrtf => Ok(Policy::Lrtf),
        }
    }
}
