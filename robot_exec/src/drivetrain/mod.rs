//! # Drivetrain module
//!
//! The drivetrain is a four module swerve base. Every module can be steered and driven
//! independently, so the robot can translate in any direction while rotating.
//!
//! A single chassis velocity demand is turned into four module targets by [`SwerveKinematics`],
//! scaled down together if any module would exceed its maximum speed, and each target is then
//! optimised so no module ever steers through more than a quarter turn. The measured module
//! positions and the gyro are integrated back into a field pose by [`SwerveOdometry`] in the
//! drivetrain's periodic hook.
//!
//! Frames used throughout:
//!
//! - Robot body: x forward, y left, angles anticlockwise from x.
//! - Field: fixed at the point the pose was last reset, same handedness.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod kinematics;
mod module;
mod odometry;
mod params;
mod slew;
mod state;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use kinematics::*;
pub use module::*;
pub use odometry::*;
pub use params::*;
pub use slew::*;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of swerve modules on the drivetrain.
pub const NUM_MODULES: usize = 4;

/// Module names, in the order used by every per-module array.
pub const MODULE_NAMES: [&str; NUM_MODULES] = ["front_left", "front_right", "rear_left", "rear_right"];

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur in the drivetrain.
#[derive(Debug, thiserror::Error)]
pub enum DrivetrainError {
    #[error("The module positions do not define a usable geometry (all modules at one point?)")]
    DegenerateGeometry,

    #[error("Invalid drive demand ({0}, {1}, {2}), all values must be finite")]
    InvalidDemand(f64, f64, f64),

    #[error("Module {0} rejected its reference: {1}")]
    ModuleError(&'static str, comms_if::eqpt::EqptError),

    #[error("Could not reset the gyro: {0}")]
    GyroError(comms_if::eqpt::EqptError),
}

// ------------------------------------------------------------------------------------------------
// TEST HELPERS
// ------------------------------------------------------------------------------------------------

/// The shipped drivetrain parameters.
#[cfg(test)]
pub(crate) fn test_params() -> Params {
    util::params::parse(include_str!("../../../params/drivetrain.toml")).unwrap()
}
