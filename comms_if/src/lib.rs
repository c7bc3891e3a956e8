//! # Communications interface crate.
//!
//! Provides the interfaces between the robot software and the collaborators it does not own: the
//! equipment (actuator ports, gyro, solenoids, vision), the operator's input snapshots, and the
//! telemetry sink.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Equipment interfaces (actuators, sensors, vision) and their loopback stand-ins
pub mod eqpt;

/// Operator input snapshots
pub mod input;

/// Telemetry sink and key/value table
pub mod tm;
