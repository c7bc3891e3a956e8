//! Drive to a point on the field, arriving at a heading

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;
use util::maths::ang_dist;

use super::{
    controllers::{AxisController, PidController},
    stop_drivetrain, DriveToPointParams, RotateParams,
};
use crate::{
    drivetrain::Pose2D,
    robot::Robot,
    sched::{Requirements, SubsystemId, Task, TaskError, Tick},
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Drives the robot in a straight line to a field pose, turning to the pose's heading on the way.
///
/// Speed along the line comes from a controller on the remaining distance, turn rate from a
/// controller on the heading error. The task finishes once both are within tolerance.
pub struct DriveToPoint {
    name: String,
    target: Pose2D,
    dist_ctrl: AxisController,
    head_ctrl: AxisController,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl DriveToPoint {
    pub fn new(target: Pose2D, params: &DriveToPointParams, rotate: &RotateParams) -> Self {
        Self {
            name: format!(
                "Drive to ({:.2}, {:.2}, {:.1} deg)",
                target.x_m,
                target.y_m,
                target.heading_rad.to_degrees()
            ),
            target,
            dist_ctrl: AxisController::new(
                PidController::new(params.gains),
                params.tolerance_m,
                params.max_speed_ms,
                params.min_speed_ms,
            ),
            head_ctrl: AxisController::new(
                PidController::new_continuous(rotate.gains),
                rotate.tolerance_rad,
                rotate.terminal_speed_rads,
                0.0,
            ),
        }
    }
}

impl Task<Robot> for DriveToPoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        SubsystemId::Drivetrain.into()
    }

    fn start(&mut self, robot: &mut Robot, _tick: &Tick) -> Result<(), TaskError> {
        self.dist_ctrl.reset();
        self.head_ctrl.reset();
        let pose = robot.drivetrain.pose();
        debug!(
            "{}: starting {:.2} m away",
            self.name,
            (self.target.position() - pose.position()).norm()
        );
        Ok(())
    }

    fn step(&mut self, robot: &mut Robot, tick: &Tick) -> Result<(), TaskError> {
        let pose = robot.drivetrain.pose();

        let to_target = self.target.position() - pose.position();
        let dist_m = to_target.norm();
        let speed_ms = self.dist_ctrl.calculate(dist_m, tick.dt_s);

        // Inside the tolerance the direction is meaningless, so don't translate at all
        let v = if self.dist_ctrl.at_setpoint() || dist_m <= f64::EPSILON {
            to_target * 0.0
        } else {
            to_target * (speed_ms / dist_m)
        };

        let omega = self
            .head_ctrl
            .calculate(ang_dist(pose.heading_rad, self.target.heading_rad), tick.dt_s);

        robot.drivetrain.drive(v[0], v[1], omega, true, false)?;

        Ok(())
    }

    fn is_done(&self, _robot: &Robot, _tick: &Tick) -> bool {
        self.dist_ctrl.at_setpoint() && self.head_ctrl.at_setpoint()
    }

    fn stop(&mut self, robot: &mut Robot, _tick: &Tick, _interrupted: bool) {
        stop_drivetrain(robot, &self.name);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
