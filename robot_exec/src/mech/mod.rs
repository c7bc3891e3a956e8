//! # Mechanisms module
//!
//! The robot's scoring mechanisms: four position controlled joints (elevator, arm, wrist and
//! turret) and a pneumatic claw. Each is its own subsystem so that, for example, the arm can be
//! moved while another task holds the elevator.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod claw;
mod joint;
mod params;
mod tasks;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use claw::Claw;
pub use joint::Joint;
pub use params::{JointParams, MechParams};
pub use tasks::{set_claw, JointGoal, MoveJoint};

use crate::sched::SubsystemId;
use comms_if::eqpt::EqptError;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Direction to step through a joint's presets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PresetDir {
    Up,
    Down,
}

/// Errors that can occur in the mechanisms.
#[derive(Debug, thiserror::Error)]
pub enum MechError {
    #[error("{0:?} has an empty or inverted range")]
    InvalidLimits(SubsystemId),

    #[error("{0:?} cannot be sent to {1}")]
    InvalidTarget(SubsystemId, f64),

    #[error("{0:?} is not a joint")]
    NotAJoint(SubsystemId),

    #[error("{0:?} equipment error: {1}")]
    Eqpt(SubsystemId, EqptError),
}
