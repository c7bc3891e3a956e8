//! Task compositions
//!
//! Compositions are tasks built out of other tasks. Their requirements are the union of their
//! children's, and each child sees exactly the same lifecycle guarantees it would if the scheduler
//! ran it directly: one `start`, steps while running, and exactly one `stop`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::debug;

use super::{Requirements, Task, TaskError, Tick};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Runs its children one after another.
///
/// The next child is started in the same step that the previous one stopped in, and is first
/// stepped on the following tick.
pub struct Sequence<R> {
    name: String,
    reqs: Requirements,
    children: Vec<Box<dyn Task<R>>>,
    current: usize,

    /// The current child has been started and not yet stopped.
    active: bool,
}

/// Runs all children together, finishing once every child has finished.
pub struct Parallel<R> {
    name: String,
    reqs: Requirements,
    children: Vec<Child<R>>,
}

/// Runs all children together, finishing as soon as any one of them finishes.
pub struct Race<R> {
    name: String,
    reqs: Requirements,
    children: Vec<Child<R>>,
    finished: bool,
}

/// Ends its child after a fixed time if it has not finished by then.
///
/// The time is measured from the tick the timeout was started on. A child ended by the timeout is
/// stopped as interrupted.
pub struct Timeout<R> {
    name: String,
    child: Box<dyn Task<R>>,
    timeout_s: f64,
    start_s: f64,
    active: bool,
}

struct Child<R> {
    task: Box<dyn Task<R>>,
    running: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

fn union_of<'a, R: 'a>(tasks: impl Iterator<Item = &'a Box<dyn Task<R>>>) -> Requirements {
    tasks.fold(Requirements::NONE, |r, t| r.union(t.requirements()))
}

impl<R> Sequence<R> {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Task<R>>>) -> Self {
        Self {
            name: name.into(),
            reqs: union_of(children.iter()),
            children,
            current: 0,
            active: false,
        }
    }

    fn start_current(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        if let Some(child) = self.children.get_mut(self.current) {
            self.active = true;
            child.start(robot, tick)?;
        }
        Ok(())
    }
}

impl<R> Task<R> for Sequence<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.reqs
    }

    fn start(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        self.current = 0;
        self.start_current(robot, tick)
    }

    fn step(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        let child = match self.children.get_mut(self.current) {
            Some(c) => c,
            None => return Ok(()),
        };

        child.step(robot, tick)?;

        if child.is_done(robot, tick) {
            child.stop(robot, tick, false);
            self.active = false;
            self.current += 1;
            self.start_current(robot, tick)?;
        }

        Ok(())
    }

    fn is_done(&self, _robot: &R, _tick: &Tick) -> bool {
        self.current >= self.children.len()
    }

    fn stop(&mut self, robot: &mut R, tick: &Tick, _interrupted: bool) {
        if self.active {
            if let Some(child) = self.children.get_mut(self.current) {
                child.stop(robot, tick, true);
            }
            self.active = false;
        }
    }
}

impl<R> Child<R> {
    fn wrap(children: Vec<Box<dyn Task<R>>>) -> Vec<Self> {
        children
            .into_iter()
            .map(|task| Child {
                task,
                running: false,
            })
            .collect()
    }
}

/// Start every child, marking each as running before its `start` so that a failure part way
/// through still leaves the started children to be stopped.
fn start_all<R>(children: &mut [Child<R>], robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
    for c in children.iter_mut() {
        c.running = true;
        c.task.start(robot, tick)?;
    }
    Ok(())
}

fn interrupt_all<R>(children: &mut [Child<R>], robot: &mut R, tick: &Tick) {
    for c in children.iter_mut().filter(|c| c.running) {
        c.task.stop(robot, tick, true);
        c.running = false;
    }
}

impl<R> Parallel<R> {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Task<R>>>) -> Self {
        Self {
            name: name.into(),
            reqs: union_of(children.iter()),
            children: Child::wrap(children),
        }
    }
}

impl<R> Task<R> for Parallel<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.reqs
    }

    fn start(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        start_all(&mut self.children, robot, tick)
    }

    fn step(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        for c in self.children.iter_mut().filter(|c| c.running) {
            c.task.step(robot, tick)?;

            if c.task.is_done(robot, tick) {
                c.task.stop(robot, tick, false);
                c.running = false;
            }
        }
        Ok(())
    }

    fn is_done(&self, _robot: &R, _tick: &Tick) -> bool {
        self.children.iter().all(|c| !c.running)
    }

    fn stop(&mut self, robot: &mut R, tick: &Tick, _interrupted: bool) {
        interrupt_all(&mut self.children, robot, tick);
    }
}

impl<R> Race<R> {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Task<R>>>) -> Self {
        Self {
            name: name.into(),
            reqs: union_of(children.iter()),
            children: Child::wrap(children),
            finished: false,
        }
    }
}

impl<R> Task<R> for Race<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.reqs
    }

    fn start(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        self.finished = false;
        start_all(&mut self.children, robot, tick)
    }

    fn step(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        let mut winner = None;

        for (i, c) in self.children.iter_mut().enumerate().filter(|(_, c)| c.running) {
            c.task.step(robot, tick)?;

            if c.task.is_done(robot, tick) {
                c.task.stop(robot, tick, false);
                c.running = false;
                winner = Some(i);
                break;
            }
        }

        if let Some(i) = winner {
            debug!("{} won by {}", self.name, self.children[i].task.name());
            interrupt_all(&mut self.children, robot, tick);
            self.finished = true;
        }

        Ok(())
    }

    fn is_done(&self, _robot: &R, _tick: &Tick) -> bool {
        self.finished || self.children.is_empty()
    }

    fn stop(&mut self, robot: &mut R, tick: &Tick, _interrupted: bool) {
        interrupt_all(&mut self.children, robot, tick);
    }
}

impl<R> Timeout<R> {
    pub fn new(child: Box<dyn Task<R>>, timeout_s: f64) -> Self {
        Self {
            name: format!("{} (timeout {}s)", child.name(), timeout_s),
            child,
            timeout_s,
            start_s: 0.0,
            active: false,
        }
    }

    fn expired(&self, tick: &Tick) -> bool {
        tick.time_s - self.start_s >= self.timeout_s
    }
}

impl<R> Task<R> for Timeout<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.child.requirements()
    }

    fn start(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        self.start_s = tick.time_s;
        self.active = true;
        self.child.start(robot, tick)
    }

    fn step(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        self.child.step(robot, tick)
    }

    fn is_done(&self, robot: &R, tick: &Tick) -> bool {
        self.child.is_done(robot, tick) || self.expired(tick)
    }

    fn stop(&mut self, robot: &mut R, tick: &Tick, interrupted: bool) {
        if !self.active {
            return;
        }
        self.active = false;

        let completed = !interrupted && self.child.is_done(robot, tick);
        if !interrupted && !completed {
            debug!("{} expired", self.name);
        }
        self.child.stop(robot, tick, !completed);
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
