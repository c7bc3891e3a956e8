//! Implementation of the [`Scheduler`]

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;

use comms_if::tm::TelemetrySink;
use log::{debug, error, info, warn};

use super::{
    Requirements, SchedError, SubsystemId, SubsystemSet, Task, TaskError, TaskFactory, TaskId,
    TaskState, Tick, NUM_SUBSYSTEMS,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of faults kept for inspection, older faults are dropped.
const MAX_KEPT_FAULTS: usize = 32;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Fixed-tick cooperative task scheduler.
///
/// The scheduler owns every task it runs and enforces that each subsystem is owned by at most one
/// running task. Requests made between ticks (schedule, cancel) are applied at the start of the
/// next call to [`Scheduler::run`].
pub struct Scheduler<R> {
    /// Nominal tick period, used for the first tick's `dt`.
    period_s: f64,

    next_id: u64,
    tick_index: u64,
    last_time_s: Option<f64>,

    /// Tasks requested since the last tick, in request order.
    pending: Vec<Entry<R>>,

    /// Tasks which have been granted their requirements, in insertion order.
    running: Vec<Entry<R>>,

    cancel_reqs: Vec<TaskId>,
    cancel_all_req: bool,

    /// Lock registry, the task holding each subsystem.
    holders: [Option<TaskId>; NUM_SUBSYSTEMS],

    /// Default task factories, sorted by subsystem.
    defaults: Vec<(SubsystemId, TaskFactory<R>)>,

    faults: VecDeque<TaskFault>,
    num_faults: u64,
}

/// Record of a task which ended because it returned an error.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFault {
    pub id: TaskId,
    pub task: String,
    pub tick: u64,
    pub error: String,
}

struct Entry<R> {
    id: TaskId,
    reqs: Requirements,
    state: TaskState,
    task: Box<dyn Task<R>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl<R> Scheduler<R> {
    /// Create a new scheduler with the given nominal tick period.
    pub fn new(period_s: f64) -> Self {
        Self {
            period_s,
            next_id: 0,
            tick_index: 0,
            last_time_s: None,
            pending: Vec::new(),
            running: Vec::new(),
            cancel_reqs: Vec::new(),
            cancel_all_req: false,
            holders: [None; NUM_SUBSYSTEMS],
            defaults: Vec::new(),
            faults: VecDeque::new(),
            num_faults: 0,
        }
    }

    /// Request that a task be run.
    ///
    /// The task is granted its requirements at the start of the next tick, interrupting any task
    /// which currently holds one of them. If another task requested before the next tick needs one
    /// of the same subsystems, the most recent request wins and the other is never started.
    pub fn schedule(&mut self, task: Box<dyn Task<R>>) -> TaskId {
        let id = self.alloc_id();
        debug!(
            "Task {} {} requested, requires {:?}",
            task.name(),
            id,
            task.requirements()
        );
        self.pending.push(Entry::new(id, task));
        id
    }

    /// Cancel a task at the start of the next tick.
    ///
    /// A running task is stopped as interrupted, a task which has not started yet is discarded
    /// without being stopped. Returns false if the task is unknown or has already ended.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let known = self.pending.iter().chain(self.running.iter()).any(|e| e.id == id);
        if known && !self.cancel_reqs.contains(&id) {
            self.cancel_reqs.push(id);
        }
        known
    }

    /// Cancel every pending and running task at the start of the next tick.
    ///
    /// No default task is started on that tick, so the robot is left idle. Defaults return on the
    /// tick after.
    pub fn cancel_all(&mut self) {
        self.cancel_all_req = true;
    }

    /// Register the task to run on `subsystem` whenever no other task holds it.
    ///
    /// The factory is called each time the default task is needed, the tasks it makes must require
    /// `subsystem`.
    pub fn set_default_task(
        &mut self,
        subsystem: SubsystemId,
        factory: TaskFactory<R>,
    ) -> Result<(), SchedError> {
        let sample = factory();
        if !sample.requirements().contains(subsystem) {
            return Err(SchedError::DefaultMissingRequirement(
                subsystem,
                sample.name().to_string(),
            ));
        }
        info!("Default task for {:?} set to {}", subsystem, sample.name());

        match self.defaults.binary_search_by_key(&subsystem, |(s, _)| *s) {
            Ok(i) => self.defaults[i].1 = factory,
            Err(i) => self.defaults.insert(i, (subsystem, factory)),
        }

        Ok(())
    }

    /// Lifecycle state of a task, or `None` if the ID was never issued by this scheduler.
    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        if self.pending.iter().any(|e| e.id == id) {
            Some(TaskState::Idle)
        } else if let Some(e) = self.running.iter().find(|e| e.id == id) {
            Some(e.state)
        } else if id.0 < self.next_id {
            Some(TaskState::Terminated)
        } else {
            None
        }
    }

    /// True if the task has been granted its requirements and has not ended.
    pub fn is_running(&self, id: TaskId) -> bool {
        self.running.iter().any(|e| e.id == id)
    }

    /// The task currently holding `subsystem`.
    pub fn holder(&self, subsystem: SubsystemId) -> Option<TaskId> {
        self.holders[subsystem.index()]
    }

    /// Name of the task currently holding `subsystem`.
    pub fn holder_name(&self, subsystem: SubsystemId) -> Option<&str> {
        let id = self.holder(subsystem)?;
        self.running
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.task.name())
    }

    /// Names of the running tasks in insertion order.
    pub fn running_names(&self) -> Vec<&str> {
        self.running.iter().map(|e| e.task.name()).collect()
    }

    /// The most recent task faults, oldest first.
    pub fn faults(&self) -> impl Iterator<Item = &TaskFault> {
        self.faults.iter()
    }

    /// Remove and return the kept task faults.
    pub fn take_faults(&mut self) -> Vec<TaskFault> {
        self.faults.drain(..).collect()
    }

    /// Number of ticks run so far.
    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    /// Short summary of the scheduler's health.
    pub fn status(&self) -> String {
        match self.faults.back() {
            None => format!("OK, {} running", self.running.len()),
            Some(f) => format!(
                "FAULTS {}, last {} at tick {}: {}",
                self.num_faults, f.task, f.tick, f.error
            ),
        }
    }

    /// Publish the scheduler's state to telemetry.
    pub fn publish(&self, sink: &mut dyn TelemetrySink) {
        sink.publish_text("sched/status", &self.status());
        sink.publish_text("sched/running", &self.running_names().join(", "));
        sink.publish_number("sched/num_faults", self.num_faults as f64);
        for id in SubsystemId::ALL.iter() {
            sink.publish_text(
                &format!("sched/holder/{}", id.key()),
                self.holder_name(*id).unwrap_or("-"),
            );
        }
    }

    fn alloc_id(&mut self) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        id
    }

    fn next_tick(&mut self, time_s: f64) -> Tick {
        let dt_s = match self.last_time_s {
            Some(t) if time_s > t => time_s - t,
            _ => self.period_s,
        };
        self.last_time_s = Some(time_s);

        Tick {
            index: self.tick_index,
            time_s,
            dt_s,
        }
    }

    /// Stop a task that has been removed from the running list and release its locks.
    fn end(&mut self, mut entry: Entry<R>, robot: &mut R, tick: &Tick, interrupted: bool) {
        entry.state = TaskState::Ending;
        entry.task.stop(robot, tick, interrupted);
        entry.state = TaskState::Terminated;

        for holder in self.holders.iter_mut() {
            if *holder == Some(entry.id) {
                *holder = None;
            }
        }

        debug!(
            "Task {} {} ended{}",
            entry.task.name(),
            entry.id,
            if interrupted { " (interrupted)" } else { "" }
        );
    }

    fn grant(&mut self, mut entry: Entry<R>) {
        for id in entry.reqs.iter() {
            self.holders[id.index()] = Some(entry.id);
        }
        entry.state = TaskState::Initializing;
        self.running.push(entry);
    }

    /// Returns true if everything was cancelled.
    fn process_cancels(&mut self, robot: &mut R, tick: &Tick) -> bool {
        let all = self.cancel_all_req;
        if self.cancel_all_req {
            self.cancel_all_req = false;
            self.cancel_reqs.clear();

            if !self.pending.is_empty() || !self.running.is_empty() {
                info!("Cancelling all tasks");
            }
            self.pending.clear();

            let running = std::mem::take(&mut self.running);
            for entry in running {
                self.end(entry, robot, tick, true);
            }
        }

        for id in std::mem::take(&mut self.cancel_reqs) {
            if let Some(i) = self.pending.iter().position(|e| e.id == id) {
                let entry = self.pending.remove(i);
                debug!("Task {} {} discarded before starting", entry.task.name(), id);
            } else if let Some(i) = self.running.iter().position(|e| e.id == id) {
                let entry = self.running.remove(i);
                info!("Task {} {} cancelled", entry.task.name(), id);
                self.end(entry, robot, tick, true);
            }
        }

        all
    }

    fn accept_pending(&mut self, robot: &mut R, tick: &Tick) {
        let pending = std::mem::take(&mut self.pending);

        // Walk newest first so that the most recent request wins any conflict
        let mut claimed = Requirements::NONE;
        let mut accepted = Vec::with_capacity(pending.len());
        for entry in pending.into_iter().rev() {
            if entry.reqs.intersects(claimed) {
                warn!(
                    "Task {} {} rejected, a later request needs {:?}",
                    entry.task.name(),
                    entry.id,
                    entry.reqs.intersection(claimed)
                );
                continue;
            }
            claimed = claimed.union(entry.reqs);
            accepted.push(entry);
        }

        for entry in accepted.into_iter().rev() {
            self.preempt(&entry, robot, tick);
            info!("Task {} {} scheduled", entry.task.name(), entry.id);
            self.grant(entry);
        }
    }

    /// Interrupt every running task which needs one of the subsystems `by` requires.
    fn preempt(&mut self, by: &Entry<R>, robot: &mut R, tick: &Tick) {
        let mut i = 0;
        while i < self.running.len() {
            if self.running[i].reqs.intersects(by.reqs) {
                let entry = self.running.remove(i);
                info!(
                    "Task {} {} interrupted by {} {}",
                    entry.task.name(),
                    entry.id,
                    by.task.name(),
                    by.id
                );
                self.end(entry, robot, tick, true);
            } else {
                i += 1;
            }
        }
    }

    fn schedule_defaults(&mut self) {
        for i in 0..self.defaults.len() {
            if self.holders[self.defaults[i].0.index()].is_some() {
                continue;
            }

            let task = (self.defaults[i].1)();

            // Never let a default task displace anything
            if task
                .requirements()
                .iter()
                .any(|s| self.holders[s.index()].is_some())
            {
                continue;
            }

            let id = self.alloc_id();
            debug!(
                "Default task {} {} started for {:?}",
                task.name(),
                id,
                self.defaults[i].0
            );
            self.grant(Entry::new(id, task));
        }
    }

    fn step_running(&mut self, robot: &mut R, tick: &Tick) {
        let mut i = 0;
        while i < self.running.len() {
            match Self::advance(&mut self.running[i], robot, tick) {
                Ok(false) => i += 1,
                Ok(true) => {
                    let entry = self.running.remove(i);
                    self.end(entry, robot, tick, false);
                }
                Err(e) => {
                    let entry = self.running.remove(i);
                    error!("Task {} {} failed: {}", entry.task.name(), entry.id, e);
                    self.record_fault(&entry, tick, e);
                    self.end(entry, robot, tick, true);
                }
            }
        }
    }

    /// Start (if needed), step and poll one task. Returns true if the task is done.
    fn advance(entry: &mut Entry<R>, robot: &mut R, tick: &Tick) -> Result<bool, TaskError> {
        if entry.state == TaskState::Initializing {
            entry.task.start(robot, tick)?;
            entry.state = TaskState::Running;
        }
        entry.task.step(robot, tick)?;

        Ok(entry.task.is_done(robot, tick))
    }

    fn record_fault(&mut self, entry: &Entry<R>, tick: &Tick, error: TaskError) {
        if self.faults.len() == MAX_KEPT_FAULTS {
            self.faults.pop_front();
        }
        self.faults.push_back(TaskFault {
            id: entry.id,
            task: entry.task.name().to_string(),
            tick: tick.index,
            error: error.to_string(),
        });
        self.num_faults += 1;
    }
}

impl<R: SubsystemSet> Scheduler<R> {
    /// Run one tick at `time_s`.
    ///
    /// Cancellations are applied, pending tasks are granted their subsystems (interrupting the
    /// previous holders), default tasks are started on idle subsystems unless everything was
    /// cancelled this tick, every running task is
    /// stepped in insertion order, and finally every subsystem's periodic hook is called.
    pub fn run(&mut self, robot: &mut R, time_s: f64) -> Tick {
        let tick = self.next_tick(time_s);

        let cancelled_all = self.process_cancels(robot, &tick);
        self.accept_pending(robot, &tick);
        if !cancelled_all {
            self.schedule_defaults();
        }
        self.step_running(robot, &tick);

        robot.for_each_subsystem(&mut |s| s.periodic(&tick));

        self.tick_index += 1;
        tick
    }
}

impl<R> Entry<R> {
    fn new(id: TaskId, task: Box<dyn Task<R>>) -> Self {
        Self {
            id,
            reqs: task.requirements(),
            state: TaskState::Idle,
            task,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::sched::testing::{ProbeTask, TestRobot};
    use SubsystemId::*;

    const DT: f64 = 0.02;

    fn run(sched: &mut Scheduler<TestRobot>, robot: &mut TestRobot) -> Tick {
        let t = sched.tick_index() as f64 * DT;
        sched.run(robot, t)
    }

    /// Check the lock registry against the running tasks.
    fn assert_locks_consistent(sched: &Scheduler<TestRobot>) {
        let mut seen = Requirements::NONE;
        for e in sched.running.iter() {
            assert!(
                !e.reqs.intersects(seen),
                "two running tasks share a subsystem"
            );
            seen = seen.union(e.reqs);
            for s in e.reqs.iter() {
                assert_eq!(sched.holder(s), Some(e.id));
            }
        }
        for s in SubsystemId::ALL.iter() {
            if !seen.contains(*s) {
                assert_eq!(sched.holder(*s), None);
            }
        }
    }

    #[test]
    fn test_lifecycle() {
        let mut robot = TestRobot::new(&[Drivetrain]);
        let mut sched = Scheduler::new(DT);

        let a = sched.schedule(ProbeTask::new("a", &[Drivetrain]).done_after(2).boxed());
        assert_eq!(sched.state(a), Some(TaskState::Idle));
        assert_eq!(sched.holder(Drivetrain), None);

        run(&mut sched, &mut robot);
        assert_eq!(sched.state(a), Some(TaskState::Running));
        assert_eq!(sched.holder(Drivetrain), Some(a));

        run(&mut sched, &mut robot);
        assert_eq!(sched.state(a), Some(TaskState::Terminated));
        assert_eq!(sched.holder(Drivetrain), None);

        assert_eq!(
            robot.task_events(),
            vec!["a:start", "a:step", "a:step", "a:stop(false)"]
        );
    }

    #[test]
    fn test_first_tick_dt_is_nominal() {
        let mut robot = TestRobot::new(&[]);
        let mut sched = Scheduler::new(DT);

        let t0 = sched.run(&mut robot, 10.0);
        let t1 = sched.run(&mut robot, 10.05);

        assert_eq!(t0.index, 0);
        assert!((t0.dt_s - DT).abs() < 1e-12);
        assert_eq!(t1.index, 1);
        assert!((t1.dt_s - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_preemption() {
        let mut robot = TestRobot::new(&[Drivetrain]);
        let mut sched = Scheduler::new(DT);

        let a = sched.schedule(ProbeTask::new("a", &[Drivetrain]).boxed());
        run(&mut sched, &mut robot);
        robot.clear();

        let b = sched.schedule(ProbeTask::new("b", &[Drivetrain]).boxed());
        run(&mut sched, &mut robot);

        // A is interrupted before B starts, on the tick after B was requested
        assert_eq!(
            robot.task_events(),
            vec!["a:stop(true)", "b:start", "b:step"]
        );
        assert_eq!(sched.state(a), Some(TaskState::Terminated));
        assert_eq!(sched.state(b), Some(TaskState::Running));
        assert_eq!(sched.holder(Drivetrain), Some(b));
    }

    #[test]
    fn test_same_tick_tie_break() {
        let mut robot = TestRobot::new(&[Drivetrain, Arm]);
        let mut sched = Scheduler::new(DT);

        let a = sched.schedule(ProbeTask::new("a", &[Drivetrain, Arm]).boxed());
        let b = sched.schedule(ProbeTask::new("b", &[Arm]).boxed());
        let c = sched.schedule(ProbeTask::new("c", &[]).boxed());
        run(&mut sched, &mut robot);

        // The earlier conflicting request is never started or stopped
        assert_eq!(robot.count("a:start"), 0);
        assert_eq!(robot.count("a:stop(true)"), 0);
        assert_eq!(sched.state(a), Some(TaskState::Terminated));
        assert!(sched.is_running(b));
        assert!(sched.is_running(c));
        assert_eq!(sched.holder(Arm), Some(b));
        assert_eq!(sched.holder(Drivetrain), None);
    }

    #[test]
    fn test_disjoint_requests_both_accepted() {
        let mut robot = TestRobot::new(&[Drivetrain, Arm]);
        let mut sched = Scheduler::new(DT);

        let a = sched.schedule(ProbeTask::new("a", &[Drivetrain]).boxed());
        let b = sched.schedule(ProbeTask::new("b", &[Arm]).boxed());
        run(&mut sched, &mut robot);

        assert!(sched.is_running(a));
        assert!(sched.is_running(b));
        assert_eq!(sched.running_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_default_task_restarts() {
        let mut robot = TestRobot::new(&[Drivetrain]);
        let mut sched = Scheduler::new(DT);
        sched
            .set_default_task(
                Drivetrain,
                Box::new(|| ProbeTask::new("default", &[Drivetrain]).boxed()),
            )
            .unwrap();

        run(&mut sched, &mut robot);
        assert_eq!(sched.holder_name(Drivetrain), Some("default"));

        let a = sched.schedule(ProbeTask::new("a", &[Drivetrain]).done_after(1).boxed());
        run(&mut sched, &mut robot);
        assert_eq!(sched.state(a), Some(TaskState::Terminated));
        assert_eq!(robot.count("default:stop(true)"), 1);

        // Freed on the previous tick, the default comes back on this one
        run(&mut sched, &mut robot);
        assert_eq!(sched.holder_name(Drivetrain), Some("default"));
        assert_eq!(robot.count("default:start"), 2);

        assert_eq!(
            robot.task_events(),
            vec![
                "default:start",
                "default:step",
                "default:stop(true)",
                "a:start",
                "a:step",
                "a:stop(false)",
                "default:start",
                "default:step",
            ]
        );
    }

    #[test]
    fn test_default_task_must_require_subsystem() {
        let mut sched: Scheduler<TestRobot> = Scheduler::new(DT);
        let res = sched.set_default_task(
            Arm,
            Box::new(|| ProbeTask::new("wrong", &[Drivetrain]).boxed()),
        );
        assert!(matches!(
            res,
            Err(SchedError::DefaultMissingRequirement(Arm, _))
        ));
    }

    #[test]
    fn test_faulty_task_is_stopped_and_others_continue() {
        let mut robot = TestRobot::new(&[Drivetrain, Arm]);
        let mut sched = Scheduler::new(DT);

        let a = sched.schedule(ProbeTask::new("a", &[Drivetrain]).failing_on_step(2).boxed());
        let b = sched.schedule(ProbeTask::new("b", &[Arm]).boxed());

        run(&mut sched, &mut robot);
        run(&mut sched, &mut robot);
        run(&mut sched, &mut robot);

        assert_eq!(robot.count("a:step"), 2);
        assert_eq!(robot.count("a:stop(true)"), 1);
        assert_eq!(robot.count("b:step"), 3);
        assert_eq!(sched.state(a), Some(TaskState::Terminated));
        assert!(sched.is_running(b));
        assert_eq!(sched.holder(Drivetrain), None);

        let faults: Vec<_> = sched.faults().cloned().collect();
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].id, a);
        assert_eq!(faults[0].tick, 1);
        assert!(sched.status().starts_with("FAULTS 1"));

        assert_eq!(sched.take_faults().len(), 1);
        assert_eq!(sched.faults().count(), 0);
    }

    #[test]
    fn test_start_failure_still_stops() {
        let mut robot = TestRobot::new(&[Drivetrain]);
        let mut sched = Scheduler::new(DT);

        sched.schedule(ProbeTask::new("a", &[Drivetrain]).failing_on_start().boxed());
        run(&mut sched, &mut robot);

        assert_eq!(robot.task_events(), vec!["a:start", "a:stop(true)"]);
        assert_eq!(sched.holder(Drivetrain), None);
    }

    #[test]
    fn test_cancel() {
        let mut robot = TestRobot::new(&[Drivetrain]);
        let mut sched = Scheduler::new(DT);

        // Cancelled before it ever started, never stopped
        let a = sched.schedule(ProbeTask::new("a", &[Drivetrain]).boxed());
        assert!(sched.cancel(a));
        run(&mut sched, &mut robot);
        assert!(robot.task_events().is_empty());
        assert_eq!(sched.state(a), Some(TaskState::Terminated));

        // Running, stopped as interrupted on the next tick
        let b = sched.schedule(ProbeTask::new("b", &[Drivetrain]).boxed());
        run(&mut sched, &mut robot);
        assert!(sched.cancel(b));
        assert!(sched.is_running(b));
        run(&mut sched, &mut robot);
        assert_eq!(
            robot.task_events(),
            vec!["b:start", "b:step", "b:stop(true)"]
        );
        assert!(!sched.cancel(b));
        assert_eq!(sched.state(TaskId(100)), None);
    }

    #[test]
    fn test_cancel_all() {
        let mut robot = TestRobot::new(&[Drivetrain, Arm]);
        let mut sched = Scheduler::new(DT);

        sched.schedule(ProbeTask::new("a", &[Drivetrain]).boxed());
        run(&mut sched, &mut robot);
        sched.schedule(ProbeTask::new("b", &[Arm]).boxed());
        sched.cancel_all();
        run(&mut sched, &mut robot);

        assert_eq!(robot.count("a:stop(true)"), 1);
        assert_eq!(robot.count("b:start"), 0);
        assert!(sched.running_names().is_empty());
    }

    #[test]
    fn test_cancel_all_leaves_defaults_idle() {
        let mut robot = TestRobot::new(&[Drivetrain]);
        let mut sched = Scheduler::new(DT);
        sched
            .set_default_task(
                Drivetrain,
                Box::new(|| ProbeTask::new("default", &[Drivetrain]).boxed()),
            )
            .unwrap();

        run(&mut sched, &mut robot);
        sched.cancel_all();
        run(&mut sched, &mut robot);

        assert_eq!(
            robot.task_events(),
            vec!["default:start", "default:step", "default:stop(true)"]
        );
        assert!(sched.running_names().is_empty());
        assert_eq!(sched.holder(Drivetrain), None);

        // Back on the following tick
        run(&mut sched, &mut robot);
        assert_eq!(sched.holder_name(Drivetrain), Some("default"));
        assert_eq!(robot.count("default:start"), 2);
    }

    #[test]
    fn test_periodic_after_tasks_in_fixed_order() {
        let mut robot = TestRobot::new(&[Drivetrain, Elevator, Claw]);
        let mut sched = Scheduler::new(DT);

        sched.schedule(ProbeTask::new("a", &[Claw]).boxed());
        run(&mut sched, &mut robot);

        assert_eq!(
            robot.events(),
            vec![
                "a:start",
                "a:step",
                "periodic:Drivetrain",
                "periodic:Elevator",
                "periodic:Claw"
            ]
        );
    }

    #[test]
    fn test_lock_invariant_under_churn() {
        let mut robot = TestRobot::new(&SubsystemId::ALL);
        let mut sched = Scheduler::new(DT);
        sched
            .set_default_task(
                Drivetrain,
                Box::new(|| ProbeTask::new("default", &[Drivetrain]).boxed()),
            )
            .unwrap();

        // Small LCG so the sequence is repeatable
        let mut seed: u64 = 12345;
        let mut next = move || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) as usize
        };

        let mut ids = Vec::new();
        for i in 0..300 {
            for _ in 0..(next() % 3) {
                let reqs: Vec<SubsystemId> = SubsystemId::ALL
                    .iter()
                    .copied()
                    .filter(|_| next() % 3 == 0)
                    .collect();
                let mut task =
                    ProbeTask::new(&format!("t{}", i), &reqs).done_after(1 + (next() % 5) as u32);
                if next() % 17 == 0 {
                    task = task.failing_on_step(1);
                }
                ids.push(sched.schedule(task.boxed()));
            }
            if next() % 7 == 0 {
                if let Some(id) = ids.get(next() % ids.len().max(1)) {
                    sched.cancel(*id);
                }
            }

            run(&mut sched, &mut robot);
            assert_locks_consistent(&sched);
        }

        // Every start is matched by exactly one stop once everything is cancelled
        sched.cancel_all();
        run(&mut sched, &mut robot);
        let events = robot.task_events();
        let starts = events.iter().filter(|e| e.ends_with(":start")).count();
        let stops = events.iter().filter(|e| e.contains(":stop(")).count();
        assert!(sched.running_names().is_empty());
        assert_eq!(starts, stops);
    }
}
