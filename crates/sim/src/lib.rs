//! Reference harness for the `ossim-scheduler` core.
//!
//! Drives the scheduler with one thread per simulated CPU and an event
//! thread that delivers arrivals and I/O completions. Time is a logical tick;
//! there is no interrupt model.

pub mod error;
pub mod harness;
pub mod report;
pub mod simulation;
pub mod workload;

pub use error::SimError;
pub use harness::SimHarness;
pub use report::SimulationReport;
pub use simulation::{SimConfig, Simulation};
pub use workload::{Burst, ProcessSpec, Workload};
