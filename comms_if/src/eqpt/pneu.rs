//! # Pneumatics contract

use super::EqptError;

/// A single acting solenoid valve.
pub trait Solenoid {
    /// Extend (`true`) or retract (`false`) the cylinder.
    fn set(&mut self, extended: bool) -> Result<(), EqptError>;

    /// Get the last state the valve was driven to.
    fn get(&self) -> Result<bool, EqptError>;
}
