//! # Autonomous routines
//!
//! Fixed sequences of behaviours, one of which is chosen at boot and scheduled at the start of
//! the autonomous period.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::vision::TargetClass;
use std::{fmt, str::FromStr};

use crate::{
    behaviours::{Balance, DriveToPoint, Params, RotateToHeading, StrafeToTarget},
    drivetrain::Pose2D,
    mech::{set_claw, MoveJoint, PresetDir},
    robot::Robot,
    sched::{Parallel, Sequence, SubsystemId, Task, TaskExt, WaitTask},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Distance driven backwards to leave the starting zone.
const TAXI_DIST_M: f64 = 2.5;

/// Distance from the starting line to the near edge of the platform.
const PLATFORM_DIST_M: f64 = 1.2;

/// Elevator and arm positions for scoring on the high node.
const SCORE_ELEVATOR_POS: f64 = 1.15;
const SCORE_ARM_POS: f64 = 1.2;

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// The available autonomous routines.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AutoRoutine {
    /// Do nothing.
    None,

    /// Drive out of the starting zone.
    Taxi,

    /// Drive onto the platform and balance on it.
    Balance,

    /// Line up on the reflective target, score the held piece, then balance.
    ScoreAndBalance,
}

/// Error returned when parsing an unknown routine name.
#[derive(Debug, thiserror::Error)]
#[error("Unknown autonomous routine \"{0}\", expected one of none, taxi, balance, score-balance")]
pub struct UnknownRoutine(String);

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl AutoRoutine {
    /// Build the routine's task, `None` if the routine does nothing.
    pub fn build(&self, params: &Params) -> Option<Box<dyn Task<Robot>>> {
        match self {
            AutoRoutine::None => None,
            AutoRoutine::Taxi => Some(taxi(params).boxed()),
            AutoRoutine::Balance => Some(balance(params).boxed()),
            AutoRoutine::ScoreAndBalance => Some(
                Sequence::new(
                    "Score and balance",
                    vec![score(params).boxed(), balance(params).boxed()],
                )
                .boxed(),
            ),
        }
    }
}

impl FromStr for AutoRoutine {
    type Err = UnknownRoutine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(AutoRoutine::None),
            "taxi" => Ok(AutoRoutine::Taxi),
            "balance" => Ok(AutoRoutine::Balance),
            "score-balance" | "score_balance" => Ok(AutoRoutine::ScoreAndBalance),
            _ => Err(UnknownRoutine(s.to_string())),
        }
    }
}

impl fmt::Display for AutoRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AutoRoutine::None => "none",
            AutoRoutine::Taxi => "taxi",
            AutoRoutine::Balance => "balance",
            AutoRoutine::ScoreAndBalance => "score-balance",
        };
        write!(f, "{}", s)
    }
}

// ------------------------------------------------------------------------------------------------
// ROUTINES
// ------------------------------------------------------------------------------------------------

fn taxi(params: &Params) -> impl Task<Robot> {
    DriveToPoint::new(
        Pose2D::new(-TAXI_DIST_M, 0.0, 0.0),
        &params.drive_to_point,
        &params.rotate,
    )
    .with_timeout(5.0)
}

fn balance(params: &Params) -> impl Task<Robot> {
    Sequence::new(
        "Mount and balance",
        vec![
            DriveToPoint::new(
                Pose2D::new(-PLATFORM_DIST_M, 0.0, 0.0),
                &params.drive_to_point,
                &params.rotate,
            )
            .with_timeout(3.0)
            .boxed(),
            Balance::new(&params.balance).with_timeout(8.0).boxed(),
        ],
    )
}

fn score(params: &Params) -> impl Task<Robot> {
    let raise = Parallel::new(
        "Raise",
        vec![
            MoveJoint::to(SubsystemId::Elevator, SCORE_ELEVATOR_POS).boxed(),
            MoveJoint::to(SubsystemId::Arm, SCORE_ARM_POS).boxed(),
        ],
    )
    .with_timeout(2.0);

    let stow = Parallel::new(
        "Stow",
        vec![
            set_claw(false).boxed(),
            MoveJoint::step_preset(SubsystemId::Elevator, PresetDir::Down).boxed(),
            MoveJoint::to(SubsystemId::Arm, 0.0).boxed(),
        ],
    )
    .with_timeout(2.0);

    Sequence::new(
        "Score",
        vec![
            StrafeToTarget::new(TargetClass::Reflective, &params.strafe)
                .with_timeout(1.5)
                .boxed(),
            raise.boxed(),
            set_claw(true).boxed(),
            WaitTask::new(0.3).boxed(),
            stow.boxed(),
            RotateToHeading::new(0.0, true, &params.rotate)
                .with_timeout(1.5)
                .boxed(),
        ],
    )
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
