//! Tasks which move the mechanisms

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use super::{Joint, MechError, PresetDir};
use crate::{
    robot::Robot,
    sched::{InstantTask, Requirements, SubsystemId, Task, TaskError, Tick},
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Where a [`MoveJoint`] task sends its joint.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum JointGoal {
    /// A fixed position.
    Position(f64),

    /// The next preset in the given direction, resolved when the task starts.
    Preset(PresetDir),
}

/// Moves one joint to a goal and finishes once it gets there.
///
/// If the goal is a preset and there is no preset in that direction the task does nothing and
/// finishes on its first step.
pub struct MoveJoint {
    name: String,
    id: SubsystemId,
    goal: JointGoal,

    /// Target sent to the joint, `None` until started or if there was nothing to do.
    target: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Open or close the claw.
pub fn set_claw(open: bool) -> InstantTask<Robot> {
    let name = if open { "Open claw" } else { "Close claw" };
    InstantTask::new(name, SubsystemId::Claw.into(), move |r: &mut Robot| {
        r.claw.set(open)?;
        Ok(())
    })
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl MoveJoint {
    pub fn new(id: SubsystemId, goal: JointGoal) -> Self {
        let name = match goal {
            JointGoal::Position(p) => format!("Move {:?} to {:.3}", id, p),
            JointGoal::Preset(dir) => format!("Step {:?} preset {:?}", id, dir),
        };

        Self {
            name,
            id,
            goal,
            target: None,
        }
    }

    pub fn to(id: SubsystemId, pos: f64) -> Self {
        Self::new(id, JointGoal::Position(pos))
    }

    pub fn step_preset(id: SubsystemId, dir: PresetDir) -> Self {
        Self::new(id, JointGoal::Preset(dir))
    }

    fn joint<'r>(&self, robot: &'r mut Robot) -> Result<&'r mut Joint, MechError> {
        robot.joint_mut(self.id).ok_or(MechError::NotAJoint(self.id))
    }
}

impl Task<Robot> for MoveJoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.id.into()
    }

    fn start(&mut self, robot: &mut Robot, _tick: &Tick) -> Result<(), TaskError> {
        let goal = self.goal;
        let joint = self.joint(robot)?;

        let pos = match goal {
            JointGoal::Position(p) => Some(p),
            JointGoal::Preset(dir) => joint.next_preset(dir),
        };

        self.target = match pos {
            Some(p) => Some(joint.set_target(p)?),
            None => {
                debug!("{:?} has no preset {:?} of its position", self.id, goal);
                None
            }
        };

        Ok(())
    }

    fn step(&mut self, _robot: &mut Robot, _tick: &Tick) -> Result<(), TaskError> {
        Ok(())
    }

    fn is_done(&self, robot: &Robot, _tick: &Tick) -> bool {
        match (self.target, robot.joint(self.id)) {
            (Some(_), Some(joint)) => joint.at_target(),
            _ => true,
        }
    }

    fn stop(&mut self, robot: &mut Robot, _tick: &Tick, interrupted: bool) {
        // A finished move is already holding its target
        if !interrupted || self.target.is_none() {
            return;
        }

        if let Err(e) = self.joint(robot).and_then(|j| j.hold()) {
            log::warn!("Could not hold {:?} after interruption: {}", self.id, e);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        robot::test_robot,
        sched::{Scheduler, Subsystem, TaskExt, TaskState},
    };

    #[test]
    fn test_move_joint() {
        let (mut robot, rig) = test_robot();
        let mut sched = Scheduler::new(0.02);

        let id = sched.schedule(MoveJoint::to(SubsystemId::Arm, 0.8).boxed());
        sched.run(&mut robot, 0.0);
        assert_eq!(robot.arm.target(), Some(0.8));

        // The joint only reports its new position after the periodic hook has read it
        rig.advance(0.02);
        sched.run(&mut robot, 0.02);
        assert!(robot.arm.at_target());
        sched.run(&mut robot, 0.04);
        assert_eq!(sched.state(id), Some(TaskState::Terminated));
    }

    #[test]
    fn test_step_preset() {
        let (mut robot, _rig) = test_robot();
        let mut sched = Scheduler::new(0.02);
        let presets = robot.elevator.presets().to_vec();
        assert!(presets.len() >= 2);

        let mut time_s = 0.0;
        for expected in presets.iter().skip(1) {
            sched.schedule(MoveJoint::step_preset(SubsystemId::Elevator, PresetDir::Up).boxed());
            for _ in 0..3 {
                sched.run(&mut robot, time_s);
                time_s += 0.02;
            }
            assert_eq!(robot.elevator.target(), Some(*expected));
        }

        // Nothing above the top preset, the task finishes without moving
        let id =
            sched.schedule(MoveJoint::step_preset(SubsystemId::Elevator, PresetDir::Up).boxed());
        sched.run(&mut robot, time_s);
        assert_eq!(sched.state(id), Some(TaskState::Terminated));
        assert_eq!(robot.elevator.target(), presets.last().copied());
    }

    #[test]
    fn test_interrupted_move_holds() {
        let (mut robot, rig) = test_robot();
        let mut sched = Scheduler::new(0.02);

        let id = sched.schedule(MoveJoint::to(SubsystemId::Wrist, 1.0).boxed());
        let t = sched.run(&mut robot, 0.0);

        // Pretend the wrist has only got part of the way
        rig.wrist.with_state(|s| s.position = 0.3);
        robot.wrist.periodic(&t);
        assert!(sched.cancel(id));
        sched.run(&mut robot, 0.02);

        assert_eq!(robot.wrist.target(), Some(0.3));
    }

    #[test]
    fn test_not_a_joint() {
        let (mut robot, _rig) = test_robot();
        let mut sched = Scheduler::new(0.02);

        sched.schedule(MoveJoint::to(SubsystemId::Claw, 1.0).boxed());
        sched.run(&mut robot, 0.0);

        let faults = sched.take_faults();
        assert_eq!(faults.len(), 1);
        assert!(faults[0].error.contains("not a joint"));
    }

    #[test]
    fn test_set_claw() {
        let (mut robot, _rig) = test_robot();
        let mut sched = Scheduler::new(0.02);

        sched.schedule(set_claw(true).then(set_claw(false).with_timeout(1.0)).boxed());
        sched.run(&mut robot, 0.0);
        assert!(robot.claw.is_open());
        sched.run(&mut robot, 0.02);
        assert!(!robot.claw.is_open());
    }
}
