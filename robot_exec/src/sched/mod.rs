//! # Scheduler module
//!
//! The scheduler runs the robot's behaviours as [`Task`]s on a fixed tick. Each task declares the
//! subsystems it needs through its [`Requirements`], and the scheduler makes sure that no two
//! running tasks ever own the same subsystem:
//!
//! - A newly scheduled task always wins, any running task holding one of its subsystems is
//!   interrupted at the start of the next tick.
//! - If two tasks requested in the same tick need the same subsystem, the later request wins and
//!   the earlier one is never started.
//! - A subsystem with a default task gets a fresh instance of it whenever nothing else holds it.
//!
//! Each tick is processed in the same order: cancellations, new requests, default tasks, stepping
//! every running task in insertion order, and finally every subsystem's periodic hook.
//!
//! Tasks can be combined with the compositions in [`group`] and built from closures with the
//! primitives in [`prims`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod group;
pub mod prims;
mod state;
mod subsystem;
mod task;
mod trigger;

#[cfg(test)]
pub(crate) mod testing;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use group::{Parallel, Race, Sequence, Timeout};
pub use prims::{FnTask, InstantTask, RunTask, TaskExt, WaitTask, WaitUntil};
pub use state::{Scheduler, TaskFault};
pub use subsystem::{Requirements, Subsystem, SubsystemId, SubsystemSet, NUM_SUBSYSTEMS};
pub use task::{Task, TaskError, TaskFactory, TaskId, TaskState, Tick};
pub use trigger::Bindings;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors from configuring the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum SchedError {
    #[error("The default task for {0:?} ({1}) does not require that subsystem")]
    DefaultMissingRequirement(SubsystemId, String),
}
