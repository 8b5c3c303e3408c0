//! Scheduler core -- answers CPU and wake-up events.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, and accessor methods
//! - `events`: the per-CPU event entry points and `schedule`
//! - `preemption`: wake-up driven preemption for LRTF
//!
//! Locking: the ready pool and the dispatch registry each have their own
//! lock and no code path holds both at once.

mod core;
mod events;
mod preemption;
#[cfg(test)]
mod tests;

pub use self::core::Scheduler;
