//! # Loopback equipment
//!
//! Bench stand-ins for the real equipment. A loopback device echoes back whatever it was last
//! commanded: a position reference is reported as the position, a velocity reference as the
//! velocity. [`LoopbackPort::advance`] integrates the commanded velocity into the position so
//! that drive encoders accumulate distance. No dynamics are modelled.
//!
//! Each device is a cheap handle around shared state, so a clone can be kept outside the robot to
//! inspect demands or inject faults.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{cell::RefCell, rc::Rc};

use super::{ActuatorPort, EqptError, Gyro, LimitDir, RefKind, Solenoid};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Loopback actuator port.
#[derive(Debug, Clone, Default)]
pub struct LoopbackPort(Rc<RefCell<PortState>>);

/// Internal state of a loopback actuator port.
#[derive(Debug, Clone, Default)]
pub struct PortState {
    pub position: f64,
    pub velocity: f64,
    pub current: f64,

    /// The last reference accepted by the port.
    pub last_ref: Option<(RefKind, f64, u8)>,

    /// Soft limits, forward then reverse.
    pub soft_limits: [Option<f64>; 2],

    /// If set all reads fail with this error.
    pub read_fault: Option<EqptError>,

    /// If true all settings (soft limits) are rejected.
    pub reject_settings: bool,
}

/// Loopback gyroscope.
#[derive(Debug, Clone, Default)]
pub struct LoopbackGyro(Rc<RefCell<GyroState>>);

/// Internal state of a loopback gyroscope.
#[derive(Debug, Clone, Default)]
pub struct GyroState {
    /// Raw yaw angle, not including the zero offset.
    pub raw_yaw_rad: f64,
    pub yaw_zero_rad: f64,
    pub pitch_rad: f64,
    pub read_fault: Option<EqptError>,
}

/// Loopback solenoid valve.
#[derive(Debug, Clone, Default)]
pub struct LoopbackSolenoid(Rc<RefCell<bool>>);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl LoopbackPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Integrate the current velocity over `dt_s` seconds into the position.
    pub fn advance(&self, dt_s: f64) {
        let mut s = self.0.borrow_mut();
        s.position += s.velocity * dt_s;
    }

    /// Get a copy of the port's state.
    pub fn state(&self) -> PortState {
        self.0.borrow().clone()
    }

    /// Modify the port's state, for example to inject a fault.
    pub fn with_state<F: FnOnce(&mut PortState)>(&self, f: F) {
        f(&mut self.0.borrow_mut())
    }

    fn read<F: FnOnce(&PortState) -> f64>(&self, f: F) -> Result<f64, EqptError> {
        let s = self.0.borrow();
        match s.read_fault {
            Some(ref e) => Err(e.clone()),
            None => Ok(f(&s)),
        }
    }
}

impl ActuatorPort for LoopbackPort {
    fn set_reference(&mut self, kind: RefKind, value: f64, slot: u8) -> Result<(), EqptError> {
        let mut s = self.0.borrow_mut();

        match kind {
            RefKind::Velocity => s.velocity = value,
            RefKind::Position | RefKind::MotionProfile => {
                // Clamp into the soft limits like the controller would
                let mut pos = value;
                if let Some(fwd) = s.soft_limits[0] {
                    pos = pos.min(fwd);
                }
                if let Some(rev) = s.soft_limits[1] {
                    pos = pos.max(rev);
                }
                s.position = pos;
                s.velocity = 0.0;
            }
            RefKind::Voltage => s.velocity = 0.0,
        }

        s.last_ref = Some((kind, value, slot));

        Ok(())
    }

    fn get_position(&self) -> Result<f64, EqptError> {
        self.read(|s| s.position)
    }

    fn get_velocity(&self) -> Result<f64, EqptError> {
        self.read(|s| s.velocity)
    }

    fn get_current(&self) -> Result<f64, EqptError> {
        self.read(|s| s.current)
    }

    fn set_soft_limit(
        &mut self,
        dir: LimitDir,
        enabled: bool,
        value: f64,
    ) -> Result<(), EqptError> {
        let mut s = self.0.borrow_mut();

        if s.reject_settings {
            return Err(EqptError::SettingRejected(format!(
                "soft limit {:?} = {}",
                dir, value
            )));
        }

        let idx = match dir {
            LimitDir::Forward => 0,
            LimitDir::Reverse => 1,
        };
        s.soft_limits[idx] = if enabled { Some(value) } else { None };

        Ok(())
    }
}

impl LoopbackGyro {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the gyro's state.
    pub fn state(&self) -> GyroState {
        self.0.borrow().clone()
    }

    /// Modify the gyro's state, for example to rotate the robot or inject a fault.
    pub fn with_state<F: FnOnce(&mut GyroState)>(&self, f: F) {
        f(&mut self.0.borrow_mut())
    }
}

impl Gyro for LoopbackGyro {
    fn yaw_rad(&self) -> Result<f64, EqptError> {
        let s = self.0.borrow();
        match s.read_fault {
            Some(ref e) => Err(e.clone()),
            None => Ok(s.raw_yaw_rad - s.yaw_zero_rad),
        }
    }

    fn pitch_rad(&self) -> Result<f64, EqptError> {
        let s = self.0.borrow();
        match s.read_fault {
            Some(ref e) => Err(e.clone()),
            None => Ok(s.pitch_rad),
        }
    }

    fn reset_yaw(&mut self) -> Result<(), EqptError> {
        let mut s = self.0.borrow_mut();
        s.yaw_zero_rad = s.raw_yaw_rad;
        Ok(())
    }
}

impl LoopbackSolenoid {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Solenoid for LoopbackSolenoid {
    fn set(&mut self, extended: bool) -> Result<(), EqptError> {
        *self.0.borrow_mut() = extended;
        Ok(())
    }

    fn get(&self) -> Result<bool, EqptError> {
        Ok(*self.0.borrow())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_loopback_port() {
        let mut port = LoopbackPort::new();
        let probe = port.clone();

        port.set_reference(RefKind::Velocity, 2.0, 0).unwrap();
        port.advance(0.5);
        assert_eq!(port.get_position().unwrap(), 1.0);
        assert_eq!(probe.state().last_ref, Some((RefKind::Velocity, 2.0, 0)));

        // Soft limits clamp position demands
        port.set_soft_limit(LimitDir::Forward, true, 0.5).unwrap();
        port.set_reference(RefKind::Position, 3.0, 1).unwrap();
        assert_eq!(port.get_position().unwrap(), 0.5);

        // Faults are visible through every handle
        probe.with_state(|s| s.read_fault = Some(EqptError::NotResponding));
        assert_eq!(port.get_velocity(), Err(EqptError::NotResponding));

        probe.with_state(|s| s.reject_settings = true);
        assert!(port.set_soft_limit(LimitDir::Reverse, true, 0.0).is_err());
    }

    #[test]
    fn test_loopback_gyro() {
        let mut gyro = LoopbackGyro::new();
        gyro.with_state(|s| s.raw_yaw_rad = 1.5);
        assert_eq!(gyro.yaw_rad().unwrap(), 1.5);

        gyro.reset_yaw().unwrap();
        assert_eq!(gyro.yaw_rad().unwrap(), 0.0);

        gyro.with_state(|s| s.raw_yaw_rad = 2.0);
        assert_eq!(gyro.yaw_rad().unwrap(), 0.5);
    }
}
