//! A single swerve module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{ActuatorPort, RefKind};
use util::maths::wrap_pi;

use super::{DrivetrainError, ModulePosition, ModuleState, Params};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// One independently driven and steered wheel.
///
/// The drive port is run under velocity control in meters/second and reports distance travelled in
/// meters. The steer port is run under position control in radians, measured from the module's
/// encoder zero which sits at `str_offset_rad` from the robot body x axis.
pub struct SwerveModule {
    name: &'static str,

    drive: Box<dyn ActuatorPort>,
    steer: Box<dyn ActuatorPort>,

    str_offset_rad: f64,
    drv_slot: u8,
    str_slot: u8,
    min_steer_speed_ms: f64,

    /// State most recently sent to the ports, after optimisation.
    desired: ModuleState,

    /// Angle most recently commanded, used when the steer angle cannot be read.
    last_angle_rad: f64,

    /// Last good drive distance reading.
    last_distance_m: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl SwerveModule {
    pub fn new(
        name: &'static str,
        drive: Box<dyn ActuatorPort>,
        steer: Box<dyn ActuatorPort>,
        str_offset_rad: f64,
        params: &Params,
    ) -> Self {
        let mut module = Self {
            name,
            drive,
            steer,
            str_offset_rad,
            drv_slot: params.drv_slot,
            str_slot: params.str_slot,
            min_steer_speed_ms: params.min_steer_speed_ms,
            desired: ModuleState::default(),
            last_angle_rad: 0.0,
            last_distance_m: 0.0,
        };

        // Start out holding wherever the module is pointing now
        if let Some(a) = module.measured_angle() {
            module.last_angle_rad = a;
        }
        module.desired.angle_rad = module.last_angle_rad;
        module.position();

        module
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Steer angle read from the encoder, if it is available.
    pub fn measured_angle(&self) -> Option<f64> {
        match self.steer.get_position() {
            Ok(p) if p.is_finite() => Some(wrap_pi(p - self.str_offset_rad)),
            _ => None,
        }
    }

    /// Best estimate of the steer angle, the last commanded angle if the encoder is unavailable.
    pub fn angle(&self) -> f64 {
        self.measured_angle().unwrap_or(self.last_angle_rad)
    }

    /// True if the steer angle is currently being estimated from the last command.
    pub fn is_steer_fallback(&self) -> bool {
        self.measured_angle().is_none()
    }

    /// Measured state of the module. An unreadable drive velocity is reported as zero.
    pub fn state(&self) -> ModuleState {
        let speed_ms = match self.drive.get_velocity() {
            Ok(v) if v.is_finite() => v,
            _ => 0.0,
        };
        ModuleState::new(speed_ms, self.angle())
    }

    /// The state most recently commanded.
    pub fn desired_state(&self) -> ModuleState {
        self.desired
    }

    /// Sample the module for odometry.
    ///
    /// If the drive distance cannot be read the previous reading is reported, so the module
    /// contributes no displacement this cycle.
    pub fn position(&mut self) -> ModulePosition {
        if let Ok(d) = self.drive.get_position() {
            if d.is_finite() {
                self.last_distance_m = d;
            }
        }
        ModulePosition::new(self.last_distance_m, self.angle())
    }

    /// Command the module to the given state.
    ///
    /// The state is optimised against the current steer angle first. If `hold_when_slow` is set
    /// and the demanded speed is below the minimum steering speed, the module keeps its last
    /// commanded angle instead of steering.
    pub fn set_desired_state(
        &mut self,
        desired: ModuleState,
        hold_when_slow: bool,
    ) -> Result<(), DrivetrainError> {
        let mut target = desired.optimise(self.angle());

        if hold_when_slow && target.speed_ms.abs() < self.min_steer_speed_ms {
            target.angle_rad = self.last_angle_rad;
        }

        self.drive
            .set_reference(RefKind::Velocity, target.speed_ms, self.drv_slot)
            .map_err(|e| DrivetrainError::ModuleError(self.name, e))?;
        self.steer
            .set_reference(
                RefKind::Position,
                wrap_pi(target.angle_rad + self.str_offset_rad),
                self.str_slot,
            )
            .map_err(|e| DrivetrainError::ModuleError(self.name, e))?;

        self.last_angle_rad = target.angle_rad;
        self.desired = target;

        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
