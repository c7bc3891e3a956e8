//! Replay a recording of operator input

use log::{info, warn};
use util::playback::{Playback, PlaybackStep};

use crate::{
    robot::Robot,
    sched::{Requirements, Task, TaskError, Tick},
};

/// Replaces the operator's live input with a recording, one snapshot per tick.
///
/// The task requires no subsystems, the recorded input is acted on by whatever tasks read the
/// operator input (the drivetrain's teleop default task and the button bindings). Live input is
/// restored when the task stops for any reason.
pub struct PlaybackTask {
    name: String,
    playback: Playback,
    ended: bool,
}

impl PlaybackTask {
    pub fn new(name: impl Into<String>, playback: Playback) -> Self {
        Self {
            name: name.into(),
            playback,
            ended: false,
        }
    }
}

impl Task<Robot> for PlaybackTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        Requirements::NONE
    }

    fn start(&mut self, _robot: &mut Robot, _tick: &Tick) -> Result<(), TaskError> {
        info!(
            "Playing back {} ({} cycles)",
            self.name,
            self.playback.num_cycles()
        );
        Ok(())
    }

    fn step(&mut self, robot: &mut Robot, _tick: &Tick) -> Result<(), TaskError> {
        match self.playback.next_snapshot() {
            PlaybackStep::Snapshot(s) => robot.input.set_override(s),
            PlaybackStep::End => {
                self.ended = true;
                robot.input.clear_override();
            }
        }
        Ok(())
    }

    fn is_done(&self, _robot: &Robot, _tick: &Tick) -> bool {
        self.ended
    }

    fn stop(&mut self, robot: &mut Robot, _tick: &Tick, interrupted: bool) {
        robot.input.clear_override();
        if interrupted {
            warn!(
                "{} interrupted with {} cycles left, live input restored",
                self.name,
                self.playback.remaining_cycles()
            );
        } else {
            info!("{} complete, live input restored", self.name);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        behaviours::Sim,
        sched::{TaskExt, TaskState},
    };
    use comms_if::input::{Axis, Button, InputSnapshot};

    const RECORDING: &str = r#"
0: {"axes": [0.0, -0.5, 0.0, 0.0, 0.0, 0.0]};
2: {"buttons": [true, false, false, false, false, false, false, false, false, false]};
"#;

    #[test]
    fn test_playback_overrides_then_restores() {
        let mut sim = Sim::new();
        sim.robot
            .input
            .set_live(InputSnapshot::default().with_axis(Axis::RightX, 0.7));

        let playback = Playback::parse(RECORDING).unwrap();
        let id = sim
            .sched
            .schedule(PlaybackTask::new("test", playback).boxed());

        sim.step();
        assert!(sim.robot.input.is_playback());
        assert_eq!(sim.robot.input.current().axis(Axis::LeftY), -0.5);
        assert_eq!(sim.robot.input.current().axis(Axis::RightX), 0.0);

        sim.step();
        sim.step();
        assert!(sim.robot.input.current().button(Button::A));

        // One more tick reaches the end of the recording
        sim.step();
        assert_eq!(sim.sched.state(id), Some(TaskState::Terminated));
        assert!(!sim.robot.input.is_playback());
        assert_eq!(sim.robot.input.current().axis(Axis::RightX), 0.7);
    }

    #[test]
    fn test_cancelled_playback_restores() {
        let mut sim = Sim::new();
        let playback = Playback::parse(RECORDING).unwrap();
        let id = sim
            .sched
            .schedule(PlaybackTask::new("test", playback).boxed());

        sim.step();
        assert!(sim.robot.input.is_playback());
        sim.sched.cancel(id);
        sim.step();
        assert!(!sim.robot.input.is_playback());
    }
}
