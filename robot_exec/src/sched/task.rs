//! The task lifecycle contract

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use comms_if::eqpt::EqptError;
use serde::Serialize;

use super::Requirements;
use crate::{drivetrain::DrivetrainError, mech::MechError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// One scheduler cycle, passed to every lifecycle call.
///
/// Tasks must take time from here rather than from the system clock so that their behaviour only
/// depends on the sequence of ticks they are given.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Tick {
    /// Number of this tick, starting from zero.
    pub index: u64,

    /// Time of this tick in seconds.
    pub time_s: f64,

    /// Time since the previous tick in seconds.
    pub dt_s: f64,
}

/// Handle to one scheduled task instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub(crate) u64);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Lifecycle state of a task.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum TaskState {
    /// Requested but not yet granted its subsystems.
    Idle,

    /// Granted its subsystems, `start` not yet returned.
    Initializing,

    /// Started and being stepped each tick.
    Running,

    /// Finished or interrupted, `stop` not yet returned.
    Ending,

    /// Stopped, or rejected before it ever started.
    Terminated,
}

/// Errors a task can return from `start` or `step`.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Equipment error: {0}")]
    Eqpt(#[from] EqptError),

    #[error("Drivetrain error: {0}")]
    Drivetrain(#[from] DrivetrainError),

    #[error("Mechanism error: {0}")]
    Mech(#[from] MechError),

    #[error("{0}")]
    Failed(String),
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A unit of behaviour run by the [`super::Scheduler`].
///
/// The scheduler guarantees the following call pattern for every task that is granted its
/// requirements:
///
/// - `start` once, on the first tick the task runs
/// - `step` once per tick, followed by `is_done`
/// - `stop` exactly once, with `interrupted` false if the task ended because `is_done` returned
///   true, and true if it was cancelled, preempted, or returned an error
///
/// A task instance is never started again after it has been stopped.
pub trait Task<R> {
    /// Name used in logs and telemetry.
    fn name(&self) -> &str;

    /// Subsystems this task must own exclusively while it runs.
    fn requirements(&self) -> Requirements;

    /// Called once before the first step.
    fn start(&mut self, _robot: &mut R, _tick: &Tick) -> Result<(), TaskError> {
        Ok(())
    }

    /// Called once per tick while the task runs. Must not block.
    fn step(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError>;

    /// Whether the task has finished, checked straight after each step.
    fn is_done(&self, _robot: &R, _tick: &Tick) -> bool {
        false
    }

    /// Called once when the task ends for any reason.
    fn stop(&mut self, _robot: &mut R, _tick: &Tick, _interrupted: bool) {}
}

/// Produces a fresh task each time it is called, used for default tasks and trigger bindings.
pub type TaskFactory<R> = Box<dyn Fn() -> Box<dyn Task<R>>>;

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl<R> fmt::Debug for dyn Task<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task({}, {:?})", self.name(), self.requirements())
    }
}
