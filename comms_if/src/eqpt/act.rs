//! # Actuator port contract
//!
//! An actuator port is a single motor controller with an attached encoder. The controller runs
//! its own closed loop, so the robot software only ever sends it a reference (and which gain
//! slot to use) and reads back the encoder.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::EqptError;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The kind of reference demanded from an actuator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefKind {
    /// Open loop voltage demand.
    ///
    /// Units: volts
    Voltage,

    /// Closed loop velocity demand.
    ///
    /// Units: output units/second (meters/second for drive axes, radians/second for joints)
    Velocity,

    /// Closed loop position demand.
    ///
    /// Units: output units (meters or radians)
    Position,

    /// Position demand followed using the controller's onboard motion profile.
    MotionProfile,
}

/// Direction of a soft limit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitDir {
    Forward,
    Reverse,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A single motor controller and encoder.
///
/// All calls are synchronous and must not block. Any I/O the device needs happens on the far side
/// of this interface.
pub trait ActuatorPort {
    /// Demand a new reference of the given kind, using the given controller gain slot.
    fn set_reference(&mut self, kind: RefKind, value: f64, slot: u8) -> Result<(), EqptError>;

    /// Get the current position of the actuator in output units.
    fn get_position(&self) -> Result<f64, EqptError>;

    /// Get the current velocity of the actuator in output units/second.
    fn get_velocity(&self) -> Result<f64, EqptError>;

    /// Get the current drawn by the actuator in amps.
    fn get_current(&self) -> Result<f64, EqptError>;

    /// Enable or disable a soft limit in the given direction.
    fn set_soft_limit(&mut self, dir: LimitDir, enabled: bool, value: f64)
        -> Result<(), EqptError>;
}
