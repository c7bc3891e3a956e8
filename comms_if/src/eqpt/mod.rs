//! # Equipment Interface
//!
//! This module defines the interfaces through which the robot software talks to its equipment.
//! The equipment itself (motor controllers, encoders, the IMU, pneumatics, the vision
//! coprocessor) is external, so only the request/response contracts live here.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod act;
pub mod imu;
pub mod loopback;
pub mod pneu;
pub mod vision;

// -----------------------------------------------------------------------------------------------
// EXPORTS
// -----------------------------------------------------------------------------------------------

pub use act::{ActuatorPort, LimitDir, RefKind};
pub use imu::Gyro;
pub use pneu::Solenoid;

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// Errors which can be returned by any piece of equipment.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EqptError {
    #[error("The device is not responding")]
    NotResponding,

    #[error("The device returned an invalid reading ({0})")]
    InvalidReading(f64),

    #[error("The device rejected the setting: {0}")]
    SettingRejected(String),
}
