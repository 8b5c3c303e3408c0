//! Per-CPU record of the currently running process.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{CpuId, SchedulerError};
use crate::process::ProcessRef;

/// Mutex-protected array with one slot per CPU.
#[derive(Debug)]
pub struct DispatchRegistry {
    slots: Mutex<Vec<Option<ProcessRef>>>,
    cpu_count: usize,
}

impl DispatchRegistry {
    pub fn new(cpu_count: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; cpu_count]),
            cpu_count,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Option<ProcessRef>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_cpu(&self, cpu: CpuId) -> Result<(), SchedulerError> {
        if cpu >= self.cpu_count {
            return Err(SchedulerError::UnknownCpu {
                cpu,
                cpu_count: self.cpu_count,
            });
        }
        Ok(())
    }

    pub fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    /// Record what `cpu` runs now. A process may occupy only one slot.
    pub fn set(&self, cpu: CpuId, process: Option<ProcessRef>) -> Result<(), SchedulerError> {
        self.check_cpu(cpu)?;
        let mut slots = self.lock();
        if let Some(p) = &process {
            let elsewhere = slots.iter().enumerate().position(|(other, slot)| {
                other != cpu && matches!(slot, Some(s) if s.pid() == p.pid())
            });
            if let Some(other) = elsewhere {
                return Err(SchedulerError::AlreadyDispatched {
                    pid: p.pid(),
                    cpu: other,
                });
            }
        }
        slots[cpu] = process;
        Ok(())
    }

    pub fn get(&self, cpu: CpuId) -> Result<Option<ProcessRef>, SchedulerError> {
        self.check_cpu(cpu)?;
        Ok(self.lock()[cpu].clone())
    }

    /// Clear the slot for `cpu` and hand back what it held.
    pub fn take(&self, cpu: CpuId) -> Result<Option<ProcessRef>, SchedulerError> {
        self.check_cpu(cpu)?;
        Ok(self.lock()[cpu].take())
    }

    /// Consistent view of every slot, read under one lock acquisition.
    pub fn snapshot_all(&self) -> Vec<Option<ProcessRef>> {
        self.lock().clone()
    }
}
