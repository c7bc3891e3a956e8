//! Leaf tasks built from closures, and the builder extension trait

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use super::{Parallel, Race, Requirements, Sequence, Task, TaskError, Tick, Timeout};

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

type StepFn<R> = Box<dyn FnMut(&mut R, &Tick) -> Result<(), TaskError>>;
type DoneFn<R> = Box<dyn Fn(&R, &Tick) -> bool>;
type StopFn<R> = Box<dyn FnMut(&mut R, &Tick, bool)>;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A task assembled from closures, one per lifecycle phase.
pub struct FnTask<R> {
    name: String,
    reqs: Requirements,
    on_start: Option<StepFn<R>>,
    on_step: StepFn<R>,
    until: Option<DoneFn<R>>,
    on_stop: Option<StopFn<R>>,
}

/// Performs a single action on its first step and then finishes.
pub struct InstantTask<R> {
    name: String,
    reqs: Requirements,
    action: StepFn<R>,
    done: bool,
}

/// Repeats an action every tick until interrupted.
pub struct RunTask<R> {
    name: String,
    reqs: Requirements,
    action: StepFn<R>,
    on_stop: Option<StopFn<R>>,
}

/// Does nothing for a fixed time.
pub struct WaitTask {
    name: String,
    duration_s: f64,
    start_s: f64,
}

/// Does nothing until a condition on the robot holds.
pub struct WaitUntil<R> {
    name: String,
    condition: DoneFn<R>,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Builder methods available on every task.
pub trait TaskExt<R: 'static>: Task<R> + Sized + 'static {
    fn boxed(self) -> Box<dyn Task<R>> {
        Box::new(self)
    }

    /// End this task after `timeout_s` if it has not finished.
    fn with_timeout(self, timeout_s: f64) -> Timeout<R> {
        Timeout::new(Box::new(self), timeout_s)
    }

    /// Run `next` after this task finishes.
    fn then<T: Task<R> + 'static>(self, next: T) -> Sequence<R> {
        let name = format!("{}, {}", self.name(), next.name());
        Sequence::new(name, vec![Box::new(self), Box::new(next)])
    }

    /// Run alongside `other`, ending when the first of the two finishes.
    fn race_with<T: Task<R> + 'static>(self, other: T) -> Race<R> {
        let name = format!("{} | {}", self.name(), other.name());
        Race::new(name, vec![Box::new(self), Box::new(other)])
    }

    /// Run alongside `other`, ending when both have finished.
    fn along_with<T: Task<R> + 'static>(self, other: T) -> Parallel<R> {
        let name = format!("{} & {}", self.name(), other.name());
        Parallel::new(name, vec![Box::new(self), Box::new(other)])
    }
}

impl<R: 'static, T: Task<R> + 'static> TaskExt<R> for T {}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<R> Task<R> for Box<dyn Task<R>> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn requirements(&self) -> Requirements {
        (**self).requirements()
    }

    fn start(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        (**self).start(robot, tick)
    }

    fn step(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        (**self).step(robot, tick)
    }

    fn is_done(&self, robot: &R, tick: &Tick) -> bool {
        (**self).is_done(robot, tick)
    }

    fn stop(&mut self, robot: &mut R, tick: &Tick, interrupted: bool) {
        (**self).stop(robot, tick, interrupted)
    }
}

impl<R> FnTask<R> {
    /// Create a task which calls `on_step` every tick and never finishes unless given a condition
    /// with [`FnTask::until`].
    pub fn new<F>(name: impl Into<String>, reqs: Requirements, on_step: F) -> Self
    where
        F: FnMut(&mut R, &Tick) -> Result<(), TaskError> + 'static,
    {
        Self {
            name: name.into(),
            reqs,
            on_start: None,
            on_step: Box::new(on_step),
            until: None,
            on_stop: None,
        }
    }

    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut R, &Tick) -> Result<(), TaskError> + 'static,
    {
        self.on_start = Some(Box::new(f));
        self
    }

    pub fn until<F>(mut self, f: F) -> Self
    where
        F: Fn(&R, &Tick) -> bool + 'static,
    {
        self.until = Some(Box::new(f));
        self
    }

    pub fn on_stop<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut R, &Tick, bool) + 'static,
    {
        self.on_stop = Some(Box::new(f));
        self
    }
}

impl<R> Task<R> for FnTask<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.reqs
    }

    fn start(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        match self.on_start.as_mut() {
            Some(f) => f(robot, tick),
            None => Ok(()),
        }
    }

    fn step(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        (self.on_step)(robot, tick)
    }

    fn is_done(&self, robot: &R, tick: &Tick) -> bool {
        match self.until.as_ref() {
            Some(f) => f(robot, tick),
            None => false,
        }
    }

    fn stop(&mut self, robot: &mut R, tick: &Tick, interrupted: bool) {
        if let Some(f) = self.on_stop.as_mut() {
            f(robot, tick, interrupted)
        }
    }
}

impl<R: 'static> InstantTask<R> {
    pub fn new<F>(name: impl Into<String>, reqs: Requirements, action: F) -> Self
    where
        F: FnMut(&mut R) -> Result<(), TaskError> + 'static,
    {
        let mut action = action;
        Self {
            name: name.into(),
            reqs,
            action: Box::new(move |r: &mut R, _: &Tick| action(r)),
            done: false,
        }
    }
}

impl<R> Task<R> for InstantTask<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.reqs
    }

    fn step(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        if !self.done {
            self.done = true;
            (self.action)(robot, tick)?;
        }
        Ok(())
    }

    fn is_done(&self, _robot: &R, _tick: &Tick) -> bool {
        self.done
    }
}

impl<R> RunTask<R> {
    pub fn new<F>(name: impl Into<String>, reqs: Requirements, action: F) -> Self
    where
        F: FnMut(&mut R, &Tick) -> Result<(), TaskError> + 'static,
    {
        Self {
            name: name.into(),
            reqs,
            action: Box::new(action),
            on_stop: None,
        }
    }

    pub fn on_stop<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut R, &Tick, bool) + 'static,
    {
        self.on_stop = Some(Box::new(f));
        self
    }
}

impl<R> Task<R> for RunTask<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.reqs
    }

    fn step(&mut self, robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        (self.action)(robot, tick)
    }

    fn stop(&mut self, robot: &mut R, tick: &Tick, interrupted: bool) {
        if let Some(f) = self.on_stop.as_mut() {
            f(robot, tick, interrupted)
        }
    }
}

impl WaitTask {
    pub fn new(duration_s: f64) -> Self {
        Self {
            name: format!("Wait {}s", duration_s),
            duration_s,
            start_s: 0.0,
        }
    }
}

impl<R> Task<R> for WaitTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        Requirements::NONE
    }

    fn start(&mut self, _robot: &mut R, tick: &Tick) -> Result<(), TaskError> {
        self.start_s = tick.time_s;
        Ok(())
    }

    fn step(&mut self, _robot: &mut R, _tick: &Tick) -> Result<(), TaskError> {
        Ok(())
    }

    fn is_done(&self, _robot: &R, tick: &Tick) -> bool {
        tick.time_s - self.start_s >= self.duration_s
    }
}

impl<R: 'static> WaitUntil<R> {
    pub fn new<F>(name: impl Into<String>, condition: F) -> Self
    where
        F: Fn(&R) -> bool + 'static,
    {
        Self {
            name: name.into(),
            condition: Box::new(move |r: &R, _: &Tick| condition(r)),
        }
    }
}

impl<R> Task<R> for WaitUntil<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        Requirements::NONE
    }

    fn step(&mut self, _robot: &mut R, _tick: &Tick) -> Result<(), TaskError> {
        Ok(())
    }

    fn is_done(&self, robot: &R, tick: &Tick) -> bool {
        (self.condition)(robot, tick)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
