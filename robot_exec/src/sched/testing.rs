//! Probe robot and tasks shared by the scheduler and composition tests

use std::{cell::RefCell, rc::Rc};

use super::*;

/// Shared record of lifecycle events.
pub(crate) type EventLog = Rc<RefCell<Vec<String>>>;

/// Robot made of probe subsystems which only record their periodic calls.
pub(crate) struct TestRobot {
    pub log: EventLog,
    pub subs: Vec<ProbeSubsystem>,
    pub flag: bool,
}

pub(crate) struct ProbeSubsystem {
    id: SubsystemId,
    log: EventLog,
}

/// Task recording every lifecycle call it receives.
pub(crate) struct ProbeTask {
    name: String,
    reqs: Requirements,
    done_after: Option<u32>,
    fail_on_step: Option<u32>,
    fail_on_start: bool,
    steps: u32,
}

impl TestRobot {
    pub fn new(ids: &[SubsystemId]) -> Self {
        let log = EventLog::default();
        Self {
            subs: ids
                .iter()
                .map(|id| ProbeSubsystem {
                    id: *id,
                    log: log.clone(),
                })
                .collect(),
            log,
            flag: false,
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// Events excluding periodic hooks.
    pub fn task_events(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter(|e| !e.starts_with("periodic"))
            .cloned()
            .collect()
    }

    pub fn count(&self, event: &str) -> usize {
        self.log.borrow().iter().filter(|e| *e == event).count()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    fn record(&self, event: String) {
        self.log.borrow_mut().push(event);
    }
}

impl SubsystemSet for TestRobot {
    fn for_each_subsystem(&mut self, f: &mut dyn FnMut(&mut dyn Subsystem)) {
        for s in self.subs.iter_mut() {
            f(s);
        }
    }
}

impl Subsystem for ProbeSubsystem {
    fn id(&self) -> SubsystemId {
        self.id
    }

    fn periodic(&mut self, _tick: &Tick) {
        self.log.borrow_mut().push(format!("periodic:{:?}", self.id));
    }
}

impl ProbeTask {
    /// A probe which never finishes on its own.
    pub fn new(name: &str, reqs: &[SubsystemId]) -> Self {
        Self {
            name: name.into(),
            reqs: Requirements::of(reqs),
            done_after: None,
            fail_on_step: None,
            fail_on_start: false,
            steps: 0,
        }
    }

    pub fn done_after(mut self, steps: u32) -> Self {
        self.done_after = Some(steps);
        self
    }

    pub fn failing_on_step(mut self, step: u32) -> Self {
        self.fail_on_step = Some(step);
        self
    }

    pub fn failing_on_start(mut self) -> Self {
        self.fail_on_start = true;
        self
    }

    pub fn boxed(self) -> Box<dyn Task<TestRobot>> {
        Box::new(self)
    }
}

impl Task<TestRobot> for ProbeTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn requirements(&self) -> Requirements {
        self.reqs
    }

    fn start(&mut self, robot: &mut TestRobot, _tick: &Tick) -> Result<(), TaskError> {
        robot.record(format!("{}:start", self.name));
        if self.fail_on_start {
            return Err(TaskError::Failed("probe start failure".into()));
        }
        Ok(())
    }

    fn step(&mut self, robot: &mut TestRobot, _tick: &Tick) -> Result<(), TaskError> {
        self.steps += 1;
        robot.record(format!("{}:step", self.name));
        if self.fail_on_step == Some(self.steps) {
            return Err(TaskError::Failed("probe step failure".into()));
        }
        Ok(())
    }

    fn is_done(&self, _robot: &TestRobot, _tick: &Tick) -> bool {
        self.done_after.map(|n| self.steps >= n).unwrap_or(false)
    }

    fn stop(&mut self, robot: &mut TestRobot, _tick: &Tick, interrupted: bool) {
        robot.record(format!("{}:stop({})", self.name, interrupted));
    }
}

/// Build a tick for driving tasks by hand.
pub(crate) fn tick(index: u64, dt_s: f64) -> Tick {
    Tick {
        index,
        time_s: index as f64 * dt_s,
        dt_s,
    }
}
