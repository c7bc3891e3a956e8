//! Main robot executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Build the robot and the scheduler, register default tasks and button bindings
//!     - Schedule the autonomous routine and input playback, if requested
//!     - Main loop, once per fixed period:
//!         - Operator input acquisition and binding polling
//!         - Scheduler tick: tasks step, then every subsystem's periodic hook
//!         - Loopback equipment update
//!         - Telemetry, decimated
//!         - Cycle management
//!
//! The executable runs on loopback equipment, which echoes references back as measurements.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{error, info, warn};
use serde::Serialize;
use std::{
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};
use structopt::StructOpt;

// Internal
use comms_if::{
    eqpt::vision::TargetClass,
    input::{Button, InputSnapshot},
    tm::TmTable,
};
use robot_lib::{
    auto::AutoRoutine,
    behaviours::{self, Balance, PlaybackTask, RotateToHeading, StrafeToTarget, TeleopDrive},
    drivetrain,
    mech::{set_claw, MechParams, MoveJoint, PresetDir},
    params::ExecParams,
    robot::Robot,
    sched::{Bindings, InstantTask, Scheduler, SubsystemId, TaskExt},
};
use util::{
    logger::{logger_init, set_cycle, LevelFilter},
    playback::Playback,
    session::{self, Session},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Command line options.
#[derive(Debug, StructOpt)]
#[structopt(name = "robot_exec", about = "Swerve robot controller")]
struct Opts {
    /// Recorded operator input to replay in place of the controller. The executable stops once
    /// the recording ends.
    #[structopt(long, parse(from_os_str))]
    playback: Option<PathBuf>,

    /// Autonomous routine to run at the start (none, taxi, balance, score-balance).
    #[structopt(long, default_value = "none")]
    auto: AutoRoutine,

    /// Number of cycles to run, runs until stopped if not given.
    #[structopt(long)]
    cycles: Option<u64>,

    /// Minimum level of log records to output.
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

/// One line of the telemetry file.
#[derive(Serialize)]
struct TmRecord<'a> {
    cycle: u64,
    time_s: f64,
    tm: &'a TmTable,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("robot_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(opts.log_level, &[], &session).wrap_err("Failed to initialise logging")?;

    info!("Robot Executable\n");
    info!("Session directory: {:?}", session.session_root);
    info!("Options: {:?}\n", opts);

    // ---- LOAD PARAMETERS ----

    let exec_params: ExecParams =
        util::params::load("exec.toml").wrap_err("Could not load exec params")?;
    let dt_params: drivetrain::Params =
        util::params::load("drivetrain.toml").wrap_err("Could not load drivetrain params")?;
    let mech_params: MechParams =
        util::params::load("mech.toml").wrap_err("Could not load mechanism params")?;
    let bhv_params: behaviours::Params =
        util::params::load("behaviours.toml").wrap_err("Could not load behaviour params")?;

    info!("Parameters loaded");

    // ---- INITIALISE ROBOT ----

    let period_s = exec_params.cycle_period_s;
    let (max_speed_ms, max_turn_rate_rads) = (dt_params.max_speed_ms, dt_params.max_turn_rate_rads);

    let (mut robot, rig) = Robot::loopback(dt_params, mech_params, period_s)
        .wrap_err("Failed to initialise the robot")?;

    // ---- INITIALISE SCHEDULER ----

    let mut sched: Scheduler<Robot> = Scheduler::new(period_s);

    {
        let teleop = bhv_params.teleop.clone();
        let rotate = bhv_params.rotate.clone();
        sched
            .set_default_task(
                SubsystemId::Drivetrain,
                Box::new(move || {
                    TeleopDrive::new(&teleop, &rotate, max_speed_ms, max_turn_rate_rads).boxed()
                }),
            )
            .wrap_err("Failed to set the drivetrain default task")?;
    }

    let mut bindings = bind_buttons(&bhv_params);
    info!("{} button bindings registered", bindings.len());

    if let Some(task) = opts.auto.build(&bhv_params) {
        info!("Autonomous routine: {}", opts.auto);
        sched.schedule(task);
    }

    let playback_id = match opts.playback {
        Some(ref path) => {
            info!("Loading playback from {:?}", path);
            let playback = Playback::from_file(path).wrap_err("Failed to load the playback")?;
            info!(
                "Loaded playback lasts {} cycles ({:.02} s)\n",
                playback.num_cycles(),
                playback.num_cycles() as f64 * period_s
            );
            Some(sched.schedule(PlaybackTask::new(path.display().to_string(), playback).boxed()))
        }
        None => None,
    };

    // ---- MAIN LOOP ----

    info!("Beginning main loop\n");

    let mut cycle: u64 = 0;
    let mut num_consec_overruns: u64 = 0;

    loop {
        let cycle_start_instant = Instant::now();
        set_cycle(cycle);

        // ---- INPUT ----

        // There is no controller on the loopback rig, the live input stays neutral
        robot.input.set_live(InputSnapshot::default());
        bindings.poll(&robot.input.current(), &mut sched);

        // ---- SCHEDULER ----

        let tick = sched.run(&mut robot, session::get_elapsed_seconds());

        // ---- EQUIPMENT ----

        rig.turn_gyro(robot.drivetrain.report().demand.omega_rads, tick.dt_s);
        rig.advance(tick.dt_s);

        // ---- TELEMETRY ----

        if cycle % exec_params.tm_decimation.max(1) == 0 {
            robot.publish_tm();
            sched.publish(&mut robot.tm);
            session.append_json(
                "tm.jsonl",
                &TmRecord {
                    cycle,
                    time_s: tick.time_s,
                    tm: &robot.tm,
                },
            );
        }

        // ---- END CONDITIONS ----

        if let Some(id) = playback_id {
            if cycle > 0 && !sched.is_running(id) {
                info!("End of playback reached, stopping");
                break;
            }
        }

        cycle += 1;
        if opts.cycles.map(|n| cycle >= n).unwrap_or(false) {
            info!("Requested number of cycles complete, stopping");
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        match Duration::from_secs_f64(period_s).checked_sub(cycle_dur) {
            Some(d) => {
                num_consec_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - period_s
                );
                num_consec_overruns += 1;

                if num_consec_overruns == exec_params.max_consec_overruns {
                    error!(
                        "{} consecutive cycle overruns, the cycle period is too short",
                        num_consec_overruns
                    );
                }
            }
        }
    }

    // ---- SHUTDOWN ----

    sched.cancel_all();
    sched.run(&mut robot, session::get_elapsed_seconds());

    let num_faults = sched.faults().count();
    if num_faults > 0 {
        warn!("{} task faults recorded, see the log for details", num_faults);
    }

    info!("End of execution after {} cycles", cycle);
    session.exit();

    Ok(())
}

/// Bind the operator's buttons to tasks.
fn bind_buttons(params: &behaviours::Params) -> Bindings<Robot> {
    let mut bindings = Bindings::new();

    let balance = params.balance.clone();
    let rotate = params.rotate.clone();
    let strafe = params.strafe.clone();

    bindings
        .on_press(
            Button::A,
            Box::new(move || Balance::new(&balance).with_timeout(10.0).boxed()),
        )
        .while_held(
            Button::B,
            Box::new(move || RotateToHeading::new(0.0, true, &rotate).boxed()),
        )
        .while_held(
            Button::X,
            Box::new(move || StrafeToTarget::new(TargetClass::Cone, &strafe).boxed()),
        )
        .on_press(
            Button::Y,
            Box::new(|| {
                InstantTask::new("Toggle claw", SubsystemId::Claw.into(), |r: &mut Robot| {
                    let open = r.claw.is_open();
                    r.claw.set(!open)?;
                    Ok(())
                })
                .boxed()
            }),
        )
        .on_press(
            Button::Start,
            Box::new(|| MoveJoint::step_preset(SubsystemId::Elevator, PresetDir::Up).boxed()),
        )
        .on_press(
            Button::Back,
            Box::new(|| MoveJoint::step_preset(SubsystemId::Elevator, PresetDir::Down).boxed()),
        )
        .toggle_on_press(
            Button::RightStick,
            Box::new(|| {
                MoveJoint::to(SubsystemId::Turret, 0.0)
                    .along_with(set_claw(false))
                    .boxed()
            }),
        )
        .on_press(
            Button::LeftStick,
            Box::new(|| {
                InstantTask::new(
                    "Zero heading",
                    SubsystemId::Drivetrain.into(),
                    |r: &mut Robot| {
                        r.drivetrain.zero_heading()?;
                        Ok(())
                    },
                )
                .boxed()
            }),
        );

    bindings
}
