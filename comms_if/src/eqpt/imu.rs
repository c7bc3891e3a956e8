//! # Inertial measurement contract

use super::EqptError;

/// The robot's gyroscope.
///
/// Yaw follows the right hand rule about the body Z+ (up) axis, so positive yaw is a turn to the
/// left. Pitch is positive when the nose of the robot is above its tail.
pub trait Gyro {
    /// Get the accumulated yaw angle in radians. The value is not wrapped.
    fn yaw_rad(&self) -> Result<f64, EqptError>;

    /// Get the pitch angle in radians.
    fn pitch_rad(&self) -> Result<f64, EqptError>;

    /// Set the current yaw to be the zero.
    fn reset_yaw(&mut self) -> Result<(), EqptError>;
}
