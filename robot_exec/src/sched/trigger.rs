//! Operator button bindings
//!
//! Bindings turn edges on operator buttons into scheduler requests. They are polled once per tick
//! with the latest input snapshot, before the scheduler runs.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::input::{Button, InputSnapshot, NUM_BUTTONS};
use log::debug;

use super::{Scheduler, TaskFactory, TaskId};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Set of button to task bindings.
pub struct Bindings<R> {
    bindings: Vec<Binding<R>>,
    prev: [bool; NUM_BUTTONS],
}

struct Binding<R> {
    button: Button,
    kind: BindKind,
    factory: TaskFactory<R>,
    active: Option<TaskId>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum BindKind {
    /// Schedule once on the rising edge.
    OnPress,

    /// Schedule on the rising edge, cancel on the falling edge.
    WhileHeld,

    /// Schedule on a rising edge, cancel on the next one if still running.
    Toggle,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<R> Default for Bindings<R> {
    fn default() -> Self {
        Self {
            bindings: Vec::new(),
            prev: [false; NUM_BUTTONS],
        }
    }
}

impl<R> Bindings<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a new task each time `button` is pressed.
    pub fn on_press(&mut self, button: Button, factory: TaskFactory<R>) -> &mut Self {
        self.bind(button, BindKind::OnPress, factory)
    }

    /// Run a task for as long as `button` is held.
    pub fn while_held(&mut self, button: Button, factory: TaskFactory<R>) -> &mut Self {
        self.bind(button, BindKind::WhileHeld, factory)
    }

    /// Start a task on one press of `button` and cancel it on the next.
    pub fn toggle_on_press(&mut self, button: Button, factory: TaskFactory<R>) -> &mut Self {
        self.bind(button, BindKind::Toggle, factory)
    }

    /// Number of bindings registered.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Process one input snapshot, scheduling or cancelling tasks on button edges.
    pub fn poll(&mut self, input: &InputSnapshot, sched: &mut Scheduler<R>) {
        for b in self.bindings.iter_mut() {
            let pressed = input.button(b.button);
            let was_pressed = self.prev[b.button as usize];
            let rising = pressed && !was_pressed;
            let falling = !pressed && was_pressed;

            match b.kind {
                BindKind::OnPress => {
                    if rising {
                        b.active = Some(sched.schedule((b.factory)()));
                    }
                }
                BindKind::WhileHeld => {
                    if rising {
                        b.active = Some(sched.schedule((b.factory)()));
                    } else if falling {
                        if let Some(id) = b.active.take() {
                            debug!("{:?} released, cancelling {}", b.button, id);
                            sched.cancel(id);
                        }
                    }
                }
                BindKind::Toggle => {
                    if rising {
                        match b.active.take() {
                            Some(id) if sched.cancel(id) => {
                                debug!("{:?} toggled off {}", b.button, id)
                            }
                            _ => b.active = Some(sched.schedule((b.factory)())),
                        }
                    }
                }
            }
        }

        for (i, p) in self.prev.iter_mut().enumerate() {
            *p = input.buttons[i];
        }
    }

    fn bind(&mut self, button: Button, kind: BindKind, factory: TaskFactory<R>) -> &mut Self {
        self.bindings.push(Binding {
            button,
            kind,
            factory,
            active: None,
        });
        self
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::sched::{
        testing::{ProbeTask, TestRobot},
        SubsystemId,
    };

    fn pressed(b: Button, down: bool) -> InputSnapshot {
        InputSnapshot::default().with_button(b, down)
    }

    #[test]
    fn test_rising_edge_schedules_once() {
        let mut robot = TestRobot::new(&[]);
        let mut sched = Scheduler::new(0.02);
        let mut bindings = Bindings::new();
        bindings.on_press(
            Button::A,
            Box::new(|| ProbeTask::new("a", &[]).done_after(100).boxed()),
        );

        // Held for several ticks, released, pressed again
        for (i, down) in [true, true, true, false, true].iter().enumerate() {
            bindings.poll(&pressed(Button::A, *down), &mut sched);
            sched.run(&mut robot, i as f64 * 0.02);
        }

        assert_eq!(robot.count("a:start"), 2);
    }

    #[test]
    fn test_while_held_cancels_on_release() {
        let mut robot = TestRobot::new(&[SubsystemId::Arm]);
        let mut sched = Scheduler::new(0.02);
        let mut bindings = Bindings::new();
        bindings.while_held(
            Button::B,
            Box::new(|| ProbeTask::new("b", &[SubsystemId::Arm]).boxed()),
        );

        for (i, down) in [true, true, false, false].iter().enumerate() {
            bindings.poll(&pressed(Button::B, *down), &mut sched);
            sched.run(&mut robot, i as f64 * 0.02);
        }

        assert_eq!(
            robot.task_events(),
            vec!["b:start", "b:step", "b:step", "b:stop(true)"]
        );
        assert_eq!(sched.holder(SubsystemId::Arm), None);
    }

    #[test]
    fn test_toggle() {
        let mut robot = TestRobot::new(&[]);
        let mut sched = Scheduler::new(0.02);
        let mut bindings = Bindings::new();
        bindings.toggle_on_press(
            Button::X,
            Box::new(|| ProbeTask::new("x", &[]).boxed()),
        );
        assert_eq!(bindings.len(), 1);

        for (i, down) in [true, false, true, false, true].iter().enumerate() {
            bindings.poll(&pressed(Button::X, *down), &mut sched);
            sched.run(&mut robot, i as f64 * 0.02);
        }

        assert_eq!(robot.count("x:start"), 2);
        assert_eq!(robot.count("x:stop(true)"), 1);
        assert_eq!(sched.running_names(), vec!["x"]);
    }
}
