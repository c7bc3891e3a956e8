//! Operator driving, the drivetrain's default task

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::input::{Axis, Button};
use log::debug;
use util::maths::{ang_dist, deadband};

use super::{
    controllers::{AxisController, PidController},
    stop_drivetrain, RotateParams, TeleopParams,
};
use crate::{
    robot::Robot,
    sched::{Requirements, SubsystemId, Task, TaskError, Tick},
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Drives the robot from the operator's sticks.
///
/// - Left stick: translation, field relative unless the left bumper is held.
/// - Right stick X: rotation.
/// - Right bumper: while held with the rotation stick centred, hold the heading the robot had
///   when the bumper was pressed.
///
/// Demands are rate limited. The task never finishes on its own.
pub struct TeleopDrive {
    params: TeleopParams,
    max_speed_ms: f64,
    max_turn_rate_rads: f64,
    head_ctrl: AxisController,

    /// Heading being held, if any.
    held_heading_rad: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl TeleopDrive {
    pub fn new(
        params: &TeleopParams,
        rotate: &RotateParams,
        max_speed_ms: f64,
        max_turn_rate_rads: f64,
    ) -> Self {
        Self {
            params: params.clone(),
            max_speed_ms,
            max_turn_rate_rads,
            head_ctrl: AxisController::new(
                PidController::new_continuous(rotate.gains),
                rotate.tolerance_rad,
                max_turn_rate_rads,
                0.0,
            ),
            held_heading_rad: None,
        }
    }
}

impl Task<Robot> for TeleopDrive {
    fn name(&self) -> &str {
        "Teleop drive"
    }

    fn requirements(&self) -> Requirements {
        SubsystemId::Drivetrain.into()
    }

    fn start(&mut self, _robot: &mut Robot, _tick: &Tick) -> Result<(), TaskError> {
        self.held_heading_rad = None;
        self.head_ctrl.reset();
        Ok(())
    }

    fn step(&mut self, robot: &mut Robot, tick: &Tick) -> Result<(), TaskError> {
        let input = robot.input.current();
        let db = self.params.deadband;
        let speed = self.max_speed_ms * self.params.speed_scale;

        // Pushing a stick forward or left gives a negative axis value
        let vx_ms = -deadband(input.axis(Axis::LeftY), db) * speed;
        let vy_ms = -deadband(input.axis(Axis::LeftX), db) * speed;
        let turn = -deadband(input.axis(Axis::RightX), db)
            * self.max_turn_rate_rads
            * self.params.turn_scale;

        let field_relative = !input.button(Button::LeftBumper);

        let heading = robot.drivetrain.heading();
        let omega = if turn == 0.0 && input.button(Button::RightBumper) {
            let held = match self.held_heading_rad {
                Some(h) => h,
                None => {
                    debug!("Holding heading {:.1} deg", heading.to_degrees());
                    self.head_ctrl.reset();
                    *self.held_heading_rad.get_or_insert(heading)
                }
            };
            self.head_ctrl.calculate(ang_dist(heading, held), tick.dt_s)
        } else {
            self.held_heading_rad = None;
            turn
        };

        robot
            .drivetrain
            .drive(vx_ms, vy_ms, omega, field_relative, true)?;

        Ok(())
    }

    fn stop(&mut self, robot: &mut Robot, _tick: &Tick, _interrupted: bool) {
        stop_drivetrain(robot, self.name());
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        behaviours::{test_params, Sim},
        drivetrain::Pose2D,
        sched::TaskExt,
    };
    use comms_if::input::InputSnapshot;
    use std::f64::consts::FRAC_PI_2;

    fn teleop(sim: &Sim) -> TeleopDrive {
        let params = test_params();
        let dt = sim.robot.drivetrain.params();
        TeleopDrive::new(
            &params.teleop,
            &params.rotate,
            dt.max_speed_ms,
            dt.max_turn_rate_rads,
        )
    }

    #[test]
    fn test_deadband_and_direction() {
        let mut sim = Sim::new();
        let task = teleop(&sim);
        sim.sched.schedule(task.boxed());

        // Stick noise inside the deadband does nothing
        sim.robot
            .input
            .set_live(InputSnapshot::default().with_axis(Axis::LeftY, -0.02));
        sim.step();
        assert_eq!(sim.robot.drivetrain.report().demand.vx_ms, 0.0);

        // Full forward ramps up rather than stepping
        sim.robot
            .input
            .set_live(InputSnapshot::default().with_axis(Axis::LeftY, -1.0));
        sim.step();
        let first = sim.robot.drivetrain.report().demand.vx_ms;
        sim.step();
        let second = sim.robot.drivetrain.report().demand.vx_ms;
        assert!(first > 0.0);
        assert!(second > first);
    }

    #[test]
    fn test_field_relative_toggle() {
        let mut sim = Sim::new();
        let task = teleop(&sim);
        sim.robot
            .drivetrain
            .reset_pose(Pose2D::new(0.0, 0.0, FRAC_PI_2));
        sim.sched.schedule(task.boxed());

        // Facing field +y, pushing forward drives field +x, which is to the robot's right
        sim.robot
            .input
            .set_live(InputSnapshot::default().with_axis(Axis::LeftY, -1.0));
        sim.step();
        let demand = sim.robot.drivetrain.report().demand;
        assert!(demand.vy_ms < 0.0);
        assert!(demand.vx_ms.abs() < 1e-9);

        // Robot relative while the left bumper is held
        sim.robot.input.set_live(
            InputSnapshot::default()
                .with_axis(Axis::LeftY, -1.0)
                .with_button(Button::LeftBumper, true),
        );
        sim.step();
        let demand = sim.robot.drivetrain.report().demand;
        assert!(demand.vx_ms > 0.0);
    }

    #[test]
    fn test_heading_hold() {
        let mut sim = Sim::new();
        let task = teleop(&sim);
        sim.sched.schedule(task.boxed());

        sim.robot
            .input
            .set_live(InputSnapshot::default().with_button(Button::RightBumper, true));
        sim.step();
        sim.step();
        assert!(sim.robot.drivetrain.report().demand.omega_rads.abs() < 1e-9);

        // Knock the robot anticlockwise, the hold turns it back
        sim.rig
            .drivetrain
            .gyro
            .with_state(|g| g.raw_yaw_rad += 0.3);
        sim.step();
        sim.step();
        assert!(sim.robot.drivetrain.report().demand.omega_rads < 0.0);

        // Turning the stick overrides the hold
        sim.robot.input.set_live(
            InputSnapshot::default()
                .with_axis(Axis::RightX, -1.0)
                .with_button(Button::RightBumper, true),
        );
        sim.step();
        sim.step();
        assert!(sim.robot.drivetrain.report().demand.omega_rads > 0.0);
    }
}
