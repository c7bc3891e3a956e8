//! Strafe sideways until a vision target is dead ahead

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::vision::TargetClass;
use log::{debug, info};

use super::{
    controllers::{AxisController, PidController},
    stop_drivetrain, StrafeParams,
};
use crate::{
    robot::Robot,
    sched::{Requirements, SubsystemId, Task, TaskError, Tick},
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Strafes the robot to line up with the nearest target of one class.
///
/// The error is the target's bearing, positive to the left, so a positive error drives the
/// robot left. While the target is out of view the robot is held still, and if it stays out of
/// view for the lost timeout the task gives up.
pub struct StrafeToTarget {
    name: String,
    class: TargetClass,
    params: StrafeParams,
    ctrl: AxisController,

    /// Time the target was last lost, `None` while it is in view.
    lost_since_s: Option<f64>,

    settled_ticks: u32,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl StrafeToTarget {
    pub fn new(class: TargetClass, params: &StrafeParams) -> Self {
        Self {
            name: format!("Strafe to {:?}", class),
            class,
            params: params.clone(),
            ctrl: AxisController::new(
                PidController::new(params.gains),
                params.tolerance_deg,
                params.max_speed_ms,
                params.min_speed_ms,
            ),
            lost_since_s: None,
            settled_ticks: 0,
        }
    }

    fn is_lost(&self, tick: &Tick) -> bool {
        self.lost_since_s
            .map(|t| tick.time_s - t >= self.params.lost_timeout_s)
            .unwrap_or(false)
    }
}

impl Task<Robot> for StrafeToTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        SubsystemId::Drivetrain.into()
    }

    fn start(&mut self, _robot: &mut Robot, _tick: &Tick) -> Result<(), TaskError> {
        self.ctrl.reset();
        self.lost_since_s = None;
        self.settled_ticks = 0;
        Ok(())
    }

    fn step(&mut self, robot: &mut Robot, tick: &Tick) -> Result<(), TaskError> {
        let vy_ms = match robot.vision.target(self.class) {
            Some(target) => {
                if self.lost_since_s.take().is_some() {
                    debug!("{}: target reacquired", self.name);
                }
                self.ctrl.calculate(target.bearing_deg, tick.dt_s)
            }
            None => {
                if self.lost_since_s.is_none() {
                    debug!("{}: target lost", self.name);
                    self.lost_since_s = Some(tick.time_s);
                }
                self.ctrl.reset();
                0.0
            }
        };

        robot.drivetrain.drive(0.0, vy_ms, 0.0, false, false)?;

        if self.ctrl.at_setpoint() {
            self.settled_ticks += 1;
        } else {
            self.settled_ticks = 0;
        }

        if self.is_lost(tick) {
            info!(
                "{}: target out of view for {:.2} s, giving up",
                self.name, self.params.lost_timeout_s
            );
        }

        Ok(())
    }

    fn is_done(&self, _robot: &Robot, tick: &Tick) -> bool {
        self.settled_ticks >= self.params.settle_ticks.max(1) || self.is_lost(tick)
    }

    fn stop(&mut self, robot: &mut Robot, _tick: &Tick, _interrupted: bool) {
        stop_drivetrain(robot, &self.name);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
