//! Rotate the robot on the spot to a heading

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use std::f64::consts::PI;
use util::maths::{ang_dist, logistic, wrap_pi};

use super::{
    controllers::{AxisController, PidController},
    stop_drivetrain, RotateParams,
};
use crate::{
    robot::Robot,
    sched::{Requirements, SubsystemId, Task, TaskError, Tick},
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Turns the robot to a field heading.
///
/// The allowed turn rate starts at the initial speed and falls off towards the terminal speed
/// along a logistic curve, so the robot turns quickly at first and arrives slowly.
pub struct RotateToHeading {
    name: String,
    target_rad: f64,

    /// If set the robot may end up facing the opposite way to the target, whichever is nearer.
    closest: bool,

    params: RotateParams,
    ctrl: AxisController,

    /// Target actually used, decided when the task starts.
    effective_rad: f64,

    start_s: f64,
    settled_ticks: u32,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Choose whichever of `target_rad` and the opposite heading is nearer to `current_rad`.
///
/// Used by mechanisms that work equally well from either end of the robot.
pub fn closest_heading(current_rad: f64, target_rad: f64) -> f64 {
    let flipped = wrap_pi(target_rad + PI);
    if ang_dist(current_rad, flipped).abs() < ang_dist(current_rad, target_rad).abs() {
        flipped
    } else {
        wrap_pi(target_rad)
    }
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl RotateToHeading {
    pub fn new(target_rad: f64, closest: bool, params: &RotateParams) -> Self {
        Self {
            name: format!(
                "Rotate to {:.1} deg{}",
                target_rad.to_degrees(),
                if closest { " (closest)" } else { "" }
            ),
            target_rad,
            closest,
            params: params.clone(),
            ctrl: AxisController::new(
                PidController::new_continuous(params.gains),
                params.tolerance_rad,
                params.initial_speed_rads,
                0.0,
            ),
            effective_rad: wrap_pi(target_rad),
            start_s: 0.0,
            settled_ticks: 0,
        }
    }

    /// Target heading in use, only meaningful once started.
    pub fn effective_target(&self) -> f64 {
        self.effective_rad
    }

    /// Heading error on the last step.
    pub fn error(&self) -> Option<f64> {
        self.ctrl.last_error()
    }

    /// Turn rate limit `elapsed_s` after the start.
    fn speed_limit(&self, elapsed_s: f64) -> f64 {
        logistic(
            elapsed_s,
            self.params.initial_speed_rads,
            self.params.terminal_speed_rads,
            self.params.transition_s,
            self.params.steepness,
        )
    }
}

impl Task<Robot> for RotateToHeading {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        SubsystemId::Drivetrain.into()
    }

    fn start(&mut self, robot: &mut Robot, tick: &Tick) -> Result<(), TaskError> {
        let heading = robot.drivetrain.heading();
        self.effective_rad = if self.closest {
            closest_heading(heading, self.target_rad)
        } else {
            wrap_pi(self.target_rad)
        };
        debug!(
            "{}: from {:.1} deg to {:.1} deg",
            self.name,
            heading.to_degrees(),
            self.effective_rad.to_degrees()
        );

        self.ctrl.reset();
        self.start_s = tick.time_s;
        self.settled_ticks = 0;

        Ok(())
    }

    fn step(&mut self, robot: &mut Robot, tick: &Tick) -> Result<(), TaskError> {
        let limit = self.speed_limit(tick.time_s - self.start_s);
        self.ctrl.set_max_output(limit);

        let error = ang_dist(robot.drivetrain.heading(), self.effective_rad);
        let omega = self.ctrl.calculate(error, tick.dt_s);
        robot.drivetrain.drive(0.0, 0.0, omega, false, false)?;

        if self.ctrl.at_setpoint() {
            self.settled_ticks += 1;
        } else {
            self.settled_ticks = 0;
        }

        Ok(())
    }

    fn is_done(&self, _robot: &Robot, _tick: &Tick) -> bool {
        self.settled_ticks >= self.params.settle_ticks.max(1)
    }

    fn stop(&mut self, robot: &mut Robot, _tick: &Tick, _interrupted: bool) {
        stop_drivetrain(robot, &self.name);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
