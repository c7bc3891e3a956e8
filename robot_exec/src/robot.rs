//! # Robot container
//!
//! Owns every subsystem along with the inputs the tasks read: the operator's controller and the
//! vision table. Tasks are handed `&mut Robot` for the duration of each lifecycle call.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::{
        loopback::{LoopbackPort, LoopbackSolenoid},
        vision::VisionTable,
        EqptError,
    },
    input::InputSnapshot,
    tm::{TelemetrySink, TmTable},
};
use log::info;

use crate::{
    drivetrain::{self, Drivetrain, DrivetrainError, DrivetrainLoopback},
    mech::{Claw, Joint, MechError, MechParams},
    sched::{Subsystem, SubsystemId, SubsystemSet},
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The robot and everything its tasks can act on.
pub struct Robot {
    pub drivetrain: Drivetrain,
    pub elevator: Joint,
    pub arm: Joint,
    pub wrist: Joint,
    pub turret: Joint,
    pub claw: Claw,

    pub input: OperatorInput,
    pub vision: VisionTable,

    /// Latest published telemetry.
    pub tm: TmTable,
}

/// The operator's controller, optionally overridden by a recording.
#[derive(Debug, Default, Clone)]
pub struct OperatorInput {
    live: InputSnapshot,
    playback: Option<InputSnapshot>,
}

/// Handles onto the loopback equipment behind a loopback robot.
#[derive(Debug, Clone)]
pub struct LoopbackRig {
    pub drivetrain: DrivetrainLoopback,
    pub elevator: LoopbackPort,
    pub arm: LoopbackPort,
    pub wrist: LoopbackPort,
    pub turret: LoopbackPort,
    pub claw: LoopbackSolenoid,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur while building the robot.
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("Could not build the drivetrain: {0}")]
    Drivetrain(#[from] DrivetrainError),

    #[error("Could not build a mechanism: {0}")]
    Mech(#[from] MechError),

    #[error("Could not build the claw: {0}")]
    Claw(#[from] EqptError),
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Robot {
    /// Build the robot on loopback equipment, returning handles to that equipment.
    pub fn loopback(
        dt_params: drivetrain::Params,
        mech_params: MechParams,
        period_s: f64,
    ) -> Result<(Self, LoopbackRig), BootError> {
        let (drivetrain, dt_rig) = Drivetrain::loopback(dt_params, period_s)?;

        let rig = LoopbackRig {
            drivetrain: dt_rig,
            elevator: LoopbackPort::new(),
            arm: LoopbackPort::new(),
            wrist: LoopbackPort::new(),
            turret: LoopbackPort::new(),
            claw: LoopbackSolenoid::new(),
        };

        let MechParams {
            elevator,
            arm,
            wrist,
            turret,
        } = mech_params;

        let robot = Self {
            drivetrain,
            elevator: Joint::new(
                SubsystemId::Elevator,
                Box::new(rig.elevator.clone()),
                elevator,
            )?,
            arm: Joint::new(SubsystemId::Arm, Box::new(rig.arm.clone()), arm)?,
            wrist: Joint::new(SubsystemId::Wrist, Box::new(rig.wrist.clone()), wrist)?,
            turret: Joint::new(SubsystemId::Turret, Box::new(rig.turret.clone()), turret)?,
            claw: Claw::new(Box::new(rig.claw.clone()))?,
            input: OperatorInput::default(),
            vision: VisionTable::default(),
            tm: TmTable::new(),
        };

        info!("Robot built on loopback equipment");

        Ok((robot, rig))
    }

    /// Get one of the joints by its subsystem ID.
    pub fn joint(&self, id: SubsystemId) -> Option<&Joint> {
        match id {
            SubsystemId::Elevator => Some(&self.elevator),
            SubsystemId::Arm => Some(&self.arm),
            SubsystemId::Wrist => Some(&self.wrist),
            SubsystemId::Turret => Some(&self.turret),
            SubsystemId::Drivetrain | SubsystemId::Claw => None,
        }
    }

    /// Get one of the joints mutably by its subsystem ID.
    pub fn joint_mut(&mut self, id: SubsystemId) -> Option<&mut Joint> {
        match id {
            SubsystemId::Elevator => Some(&mut self.elevator),
            SubsystemId::Arm => Some(&mut self.arm),
            SubsystemId::Wrist => Some(&mut self.wrist),
            SubsystemId::Turret => Some(&mut self.turret),
            SubsystemId::Drivetrain | SubsystemId::Claw => None,
        }
    }

    /// Publish every subsystem's telemetry into the robot's table.
    pub fn publish_tm(&mut self) {
        let Self {
            drivetrain,
            elevator,
            arm,
            wrist,
            turret,
            claw,
            input,
            tm,
            ..
        } = self;

        let sink: &mut dyn TelemetrySink = tm;
        drivetrain.publish(sink);
        for j in [&*elevator, &*arm, &*wrist, &*turret].iter() {
            j.publish(sink);
        }
        claw.publish(sink);
        sink.publish_bool("input/playback", input.is_playback());
    }
}

impl SubsystemSet for Robot {
    fn for_each_subsystem(&mut self, f: &mut dyn FnMut(&mut dyn Subsystem)) {
        f(&mut self.drivetrain);
        f(&mut self.elevator);
        f(&mut self.arm);
        f(&mut self.wrist);
        f(&mut self.turret);
        f(&mut self.claw);
    }
}

impl OperatorInput {
    /// The input tasks should act on this cycle.
    pub fn current(&self) -> InputSnapshot {
        self.playback.unwrap_or(self.live)
    }

    /// Set the live controller state for this cycle.
    pub fn set_live(&mut self, snapshot: InputSnapshot) {
        self.live = snapshot.sanitised();
    }

    /// Replace the live input with a recorded snapshot until the override is cleared.
    pub fn set_override(&mut self, snapshot: InputSnapshot) {
        self.playback = Some(snapshot.sanitised());
    }

    pub fn clear_override(&mut self) {
        self.playback = None;
    }

    pub fn is_playback(&self) -> bool {
        self.playback.is_some()
    }
}

impl LoopbackRig {
    /// Integrate the loopback equipment's velocities over `dt_s`.
    pub fn advance(&self, dt_s: f64) {
        self.drivetrain.advance(dt_s);
        for p in [&self.elevator, &self.arm, &self.wrist, &self.turret].iter() {
            p.advance(dt_s);
        }
    }

    /// Turn the gyro at the given rate for `dt_s`.
    ///
    /// Loopback equipment models no physics, so without this the heading only changes when set
    /// by hand.
    pub fn turn_gyro(&self, omega_rads: f64, dt_s: f64) {
        self.drivetrain
            .gyro
            .with_state(|g| g.raw_yaw_rad += omega_rads * dt_s);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

/// Build a loopback robot from the shipped parameter files.
#[cfg(test)]
pub(crate) fn test_robot() -> (Robot, LoopbackRig) {
    let mech: MechParams = util::params::parse(include_str!("../../params/mech.toml")).unwrap();
    Robot::loopback(drivetrain::test_params(), mech, 0.02).unwrap()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sched::testing::tick;
    use comms_if::input::{Axis, Button};

    #[test]
    fn test_periodic_order() {
        let (mut robot, _rig) = test_robot();
        let mut ids = Vec::new();
        robot.for_each_subsystem(&mut |s| ids.push(s.id()));
        assert_eq!(ids, SubsystemId::ALL.to_vec());
    }

    #[test]
    fn test_joint_lookup() {
        let (mut robot, _rig) = test_robot();
        for id in SubsystemId::ALL.iter() {
            let is_joint = !matches!(id, SubsystemId::Drivetrain | SubsystemId::Claw);
            assert_eq!(robot.joint(*id).is_some(), is_joint);
            let expected = if is_joint { Some(*id) } else { None };
            assert_eq!(robot.joint_mut(*id).map(|j| j.id()), expected);
        }
    }

    #[test]
    fn test_input_override() {
        let mut input = OperatorInput::default();
        input.set_live(InputSnapshot::default().with_axis(Axis::LeftY, 2.0));
        assert_eq!(input.current().axis(Axis::LeftY), 1.0);

        input.set_override(InputSnapshot::default().with_button(Button::A, true));
        assert!(input.is_playback());
        assert!(input.current().button(Button::A));
        assert_eq!(input.current().axis(Axis::LeftY), 0.0);

        input.clear_override();
        assert_eq!(input.current().axis(Axis::LeftY), 1.0);
    }

    #[test]
    fn test_publish_tm() {
        let (mut robot, _rig) = test_robot();
        robot.for_each_subsystem(&mut |s| s.periodic(&tick(0, 0.02)));
        robot.publish_tm();

        assert!(robot.tm.get("drivetrain/pose").is_some());
        assert_eq!(robot.tm.number("elevator/position"), Some(0.0));
        assert!(robot.tm.get("turret/at_target").is_some());
        assert!(robot.tm.get("claw/open").is_some());

        // The table is what gets written to the telemetry file each publish
        let json = serde_json::to_string(&robot.tm).unwrap();
        assert!(json.contains("\"elevator/at_target\":true"));
    }
}
