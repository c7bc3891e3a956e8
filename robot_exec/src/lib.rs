//! # Robot library.
//!
//! This library holds everything the robot executable runs each cycle: the task scheduler, the
//! subsystems it arbitrates, and the behaviours built on top of them. It is a library so that
//! benches and other crates in the workspace can reach the same items.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Autonomous routines - fixed sequences of behaviours selected at boot
pub mod auto;

/// Closed loop behaviours - driving tasks built on the drivetrain
pub mod behaviours;

/// Drivetrain - the four module swerve base, its kinematics and odometry
pub mod drivetrain;

/// Mechanisms - elevator, arm, wrist, turret and claw subsystems with their tasks
pub mod mech;

/// Executable parameters
pub mod params;

/// Robot container - owns every subsystem along with the operator and vision inputs
pub mod robot;

/// Scheduler - cooperative fixed-cycle task scheduling with exclusive subsystem ownership
pub mod sched;
