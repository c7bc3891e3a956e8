//! Logger setup
//!
//! All executables log through the `log` facade. This module installs a `fern` dispatcher which
//! writes every record to stdout and to the session's log file, stamped with the session time
//! and, when one has been set, the number of the control cycle that emitted it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use fern;
use log::{self, info};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

/// The cycle currently being executed, `u64::MAX` before the first cycle.
static CURRENT_CYCLE: AtomicU64 = AtomicU64::new(u64::MAX);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level less than `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `overrides` sets a different level for particular targets (for example to quieten a chatty
/// module while tracing the rest of the system).
///
/// # Notes
///
/// - `min_level` must be at least `log::Level::Info`, warnings and errors are never filtered out
///   entirely.
///
/// # Safety
///
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    min_level: LevelFilter,
    overrides: &[(&'static str, LevelFilter)],
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file =
        fern::log_file(session.log_file_path.clone()).map_err(LoggerInitError::LogFileInitError)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            let stamp = format_stamp(session::get_elapsed_seconds(), level_to_str(record.level()));

            // Detailed levels carry the target so the source can be found
            if record.level() > log::Level::Info {
                out.finish(format_args!("{} {}: {}", stamp, record.target(), message))
            } else {
                out.finish(format_args!("{} {}", stamp, message))
            }
        })
        .level(min_level);

    for (target, level) in overrides {
        dispatch = dispatch.level_for(*target, *level);
    }

    dispatch
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    for (target, level) in overrides {
        info!("    Log level for {}: {:?}", target, level);
    }
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

/// Set the number of the control cycle currently executing, used to stamp log records.
pub fn set_cycle(cycle: u64) {
    CURRENT_CYCLE.store(cycle, Ordering::Relaxed);
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Build the stamp placed at the start of every record.
fn format_stamp(elapsed_s: f64, level: ColoredString) -> String {
    match CURRENT_CYCLE.load(Ordering::Relaxed) {
        u64::MAX => format!("[{:10.6} {}]", elapsed_s, level),
        cycle => format!("[{:10.6} #{:<6} {}]", elapsed_s, cycle, level),
    }
}

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info => "INF".normal(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold(),
    }
}
