//! # Behaviours module
//!
//! Closed loop driving tasks built on the drivetrain. Each one is a [`Task`] requiring the
//! drivetrain, follows `seeking -> holding/finished`, and commands zero chassis velocity when it
//! stops for any reason.
//!
//! [`Task`]: crate::sched::Task

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod balance;
pub mod controllers;
mod drive_to_point;
mod params;
mod playback;
mod rotate;
mod strafe;
mod teleop;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use balance::Balance;
pub use drive_to_point::DriveToPoint;
pub use params::*;
pub use playback::PlaybackTask;
pub use rotate::{closest_heading, RotateToHeading};
pub use strafe::StrafeToTarget;
pub use teleop::TeleopDrive;

use log::warn;

use crate::robot::Robot;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Stop the drivetrain from a task's `stop`, which cannot return an error.
pub(crate) fn stop_drivetrain(robot: &mut Robot, task: &str) {
    if let Err(e) = robot.drivetrain.stop() {
        warn!("{} could not stop the drivetrain: {}", task, e);
    }
}

// ------------------------------------------------------------------------------------------------
// TEST HELPERS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
pub(crate) fn test_params() -> Params {
    util::params::parse(include_str!("../../../params/behaviours.toml")).unwrap()
}

/// A loopback robot whose gyro follows the commanded turn rate.
#[cfg(test)]
pub(crate) struct Sim {
    pub robot: Robot,
    pub rig: crate::robot::LoopbackRig,
    pub sched: crate::sched::Scheduler<Robot>,
    pub time_s: f64,
}

#[cfg(test)]
impl Sim {
    pub const DT: f64 = 0.02;

    pub fn new() -> Self {
        let (robot, rig) = crate::robot::test_robot();
        Self {
            robot,
            rig,
            sched: crate::sched::Scheduler::new(Self::DT),
            time_s: 0.0,
        }
    }

    /// Run one tick then move the loopback equipment on by one period.
    pub fn step(&mut self) -> crate::sched::Tick {
        let tick = self.sched.run(&mut self.robot, self.time_s);

        let omega = self.robot.drivetrain.report().demand.omega_rads;
        self.rig.turn_gyro(omega, Self::DT);
        self.rig.advance(Self::DT);
        self.time_s += Self::DT;

        tick
    }

    /// Step until the task is no longer scheduled, returning the number of ticks taken.
    pub fn run_until_done(&mut self, id: crate::sched::TaskId, max_ticks: usize) -> Option<usize> {
        for i in 0..max_ticks {
            self.step();
            if !self.sched.is_running(id) {
                return Some(i + 1);
            }
        }
        None
    }
}
