//! Implementation of the [`Drivetrain`] subsystem

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::{
        loopback::{LoopbackGyro, LoopbackPort},
        ActuatorPort, Gyro, LimitDir,
    },
    tm::TelemetrySink,
};
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::Serialize;

use super::{
    ChassisSpeeds, DrivetrainError, ModuleState, Params, Pose2D, SlewRateLimiter,
    SwerveKinematics, SwerveModule, SwerveOdometry, VectorSlewLimiter, MODULE_NAMES, NUM_MODULES,
};
use crate::sched::{Subsystem, SubsystemId, Tick};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// The swerve drivetrain subsystem.
pub struct Drivetrain {
    params: Params,
    kinematics: SwerveKinematics,
    modules: [SwerveModule; NUM_MODULES],
    gyro: Box<dyn Gyro>,
    odometry: SwerveOdometry,

    trans_limiter: VectorSlewLimiter,
    rot_limiter: SlewRateLimiter,

    /// Period of the last tick, used by the rate limiters.
    dt_s: f64,

    /// Last good pitch reading.
    pitch_rad: f64,

    report: StatusReport,
}

/// The two actuator ports of one module.
pub struct ModulePorts {
    pub drive: Box<dyn ActuatorPort>,
    pub steer: Box<dyn ActuatorPort>,
}

/// Handles onto the loopback equipment behind a loopback drivetrain.
#[derive(Debug, Clone)]
pub struct DrivetrainLoopback {
    pub drive: [LoopbackPort; NUM_MODULES],
    pub steer: [LoopbackPort; NUM_MODULES],
    pub gyro: LoopbackGyro,
}

/// Status of the drivetrain, updated by every demand and every periodic call.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// Robot relative demand after rate limiting.
    pub demand: ChassisSpeeds,

    /// Factor the last demand's module speeds were scaled by.
    pub desat_factor: f64,

    /// Modules whose steer angle is being estimated from the last command.
    pub steer_fallback: [bool; NUM_MODULES],

    /// The gyro could not be read on the last periodic call.
    pub gyro_dropout: bool,

    /// Number of periodic calls on which the gyro could not be read.
    pub num_gyro_dropouts: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Drivetrain {
    /// Create the drivetrain from its equipment.
    ///
    /// Device configuration is pushed to the ports here. A device refusing its configuration is
    /// logged and the drivetrain carries on with that device's defaults.
    pub fn new(
        params: Params,
        ports: [ModulePorts; NUM_MODULES],
        gyro: Box<dyn Gyro>,
        period_s: f64,
    ) -> Result<Self, DrivetrainError> {
        let kinematics = SwerveKinematics::new(&params.module_pos_m_rb)?;

        let [p0, p1, p2, p3] = ports;
        let mut modules = [
            Self::build_module(0, p0, &params),
            Self::build_module(1, p1, &params),
            Self::build_module(2, p2, &params),
            Self::build_module(3, p3, &params),
        ];

        let mut positions = [Default::default(); NUM_MODULES];
        for (p, m) in positions.iter_mut().zip(modules.iter_mut()) {
            *p = m.position();
        }
        let odometry = SwerveOdometry::new(Pose2D::default(), &positions);

        let pitch_rad = gyro.pitch_rad().ok().filter(|p| p.is_finite()).unwrap_or(0.0);

        Ok(Self {
            trans_limiter: VectorSlewLimiter::new(params.trans_slew_rate_mss),
            rot_limiter: SlewRateLimiter::new(params.rot_slew_rate_radss),
            params,
            kinematics,
            modules,
            gyro,
            odometry,
            dt_s: period_s,
            pitch_rad,
            report: StatusReport {
                desat_factor: 1.0,
                ..Default::default()
            },
        })
    }

    /// Create a drivetrain on loopback equipment, returning handles to that equipment.
    pub fn loopback(
        params: Params,
        period_s: f64,
    ) -> Result<(Self, DrivetrainLoopback), DrivetrainError> {
        let rig = DrivetrainLoopback {
            drive: Default::default(),
            steer: Default::default(),
            gyro: LoopbackGyro::new(),
        };

        // Point every steer encoder at its zero so the modules start aligned with the body
        for (s, offset) in rig.steer.iter().zip(params.str_offset_rad.iter()) {
            s.with_state(|st| st.position = *offset);
        }

        let port = |i: usize| ModulePorts {
            drive: Box::new(rig.drive[i].clone()),
            steer: Box::new(rig.steer[i].clone()),
        };
        let ports = [port(0), port(1), port(2), port(3)];

        let dt = Self::new(params, ports, Box::new(rig.gyro.clone()), period_s)?;

        Ok((dt, rig))
    }

    fn build_module(i: usize, mut ports: ModulePorts, params: &Params) -> SwerveModule {
        // Steering is continuous so the steer soft limits are switched off
        for dir in [LimitDir::Forward, LimitDir::Reverse].iter() {
            if let Err(e) = ports.steer.set_soft_limit(*dir, false, 0.0) {
                warn!(
                    "Could not configure {} steer soft limit {:?}: {}, using device defaults",
                    MODULE_NAMES[i], dir, e
                );
            }
        }

        SwerveModule::new(
            MODULE_NAMES[i],
            ports.drive,
            ports.steer,
            params.str_offset_rad[i],
            params,
        )
    }

    /// Drive the robot.
    ///
    /// Velocities are in meters/second and radians/second. With `field_relative` set the
    /// translation is in the field frame and is rotated into the body frame by the current heading.
    /// With `rate_limited` set the demand moves towards the given values no faster than the
    /// configured slew rates, the translation being limited as one 2D vector.
    pub fn drive(
        &mut self,
        vx_ms: f64,
        vy_ms: f64,
        omega_rads: f64,
        field_relative: bool,
        rate_limited: bool,
    ) -> Result<(), DrivetrainError> {
        if !(vx_ms.is_finite() && vy_ms.is_finite() && omega_rads.is_finite()) {
            return Err(DrivetrainError::InvalidDemand(vx_ms, vy_ms, omega_rads));
        }

        let demand = Vector2::new(vx_ms, vy_ms);
        let (v, omega_rads) = if rate_limited {
            (
                self.trans_limiter.calculate(demand, self.dt_s),
                self.rot_limiter.calculate(omega_rads, self.dt_s),
            )
        } else {
            self.trans_limiter.reset(demand);
            self.rot_limiter.reset(omega_rads);
            (demand, omega_rads)
        };

        let speeds = if field_relative {
            ChassisSpeeds::from_field_relative(v[0], v[1], omega_rads, self.heading())
        } else {
            ChassisSpeeds::new(v[0], v[1], omega_rads)
        };
        self.report.demand = speeds;

        let mut states = self.kinematics.to_module_states(&speeds);
        self.apply_states(&mut states, true)
    }

    /// Stop driving, every module keeping its current angle.
    pub fn stop(&mut self) -> Result<(), DrivetrainError> {
        self.reset_limiters();
        self.report.demand = ChassisSpeeds::default();
        self.apply_states(&mut [ModuleState::default(); NUM_MODULES], true)
    }

    /// Point every module at the centre of the robot so that it resists being pushed.
    pub fn set_x(&mut self) -> Result<(), DrivetrainError> {
        self.reset_limiters();
        self.report.demand = ChassisSpeeds::default();

        let mut states = [ModuleState::default(); NUM_MODULES];
        for (s, p) in states.iter_mut().zip(self.kinematics.positions().iter()) {
            s.angle_rad = p[1].atan2(p[0]);
        }
        self.apply_states(&mut states, false)
    }

    /// Command the modules directly, desaturating the given states first.
    pub fn set_module_states(
        &mut self,
        mut states: [ModuleState; NUM_MODULES],
    ) -> Result<(), DrivetrainError> {
        self.reset_limiters();
        self.report.demand = self.kinematics.to_chassis_speeds(&states);
        self.apply_states(&mut states, false)
    }

    /// Estimated pose of the robot on the field.
    pub fn pose(&self) -> Pose2D {
        self.odometry.pose()
    }

    /// Estimated heading of the robot on the field.
    pub fn heading(&self) -> f64 {
        self.odometry.pose().heading_rad
    }

    /// Pitch of the robot, positive nose up.
    pub fn pitch(&self) -> f64 {
        self.pitch_rad
    }

    /// Chassis velocity estimated from the measured module states.
    pub fn chassis_speeds(&self) -> ChassisSpeeds {
        self.kinematics.to_chassis_speeds(&self.module_states())
    }

    /// Measured state of each module.
    pub fn module_states(&self) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];
        for (s, m) in states.iter_mut().zip(self.modules.iter()) {
            *s = m.state();
        }
        states
    }

    /// State most recently commanded to each module.
    pub fn desired_states(&self) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];
        for (s, m) in states.iter_mut().zip(self.modules.iter()) {
            *s = m.desired_state();
        }
        states
    }

    /// Jump the pose estimate to `pose`.
    pub fn reset_pose(&mut self, pose: Pose2D) {
        let positions = self.module_positions();
        self.odometry.reset(pose, &positions);
        info!(
            "Drivetrain pose reset to ({:.3}, {:.3}, {:.1} deg)",
            pose.x_m,
            pose.y_m,
            pose.heading_rad.to_degrees()
        );
    }

    /// Make the current heading the new zero heading, keeping the position.
    pub fn zero_heading(&mut self) -> Result<(), DrivetrainError> {
        let pose = self.pose();
        self.reset_pose(Pose2D::new(pose.x_m, pose.y_m, 0.0));

        self.odometry.forget_gyro();
        self.gyro.reset_yaw().map_err(DrivetrainError::GyroError)
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }

    fn module_positions(&mut self) -> [super::ModulePosition; NUM_MODULES] {
        let mut positions = [Default::default(); NUM_MODULES];
        for (p, m) in positions.iter_mut().zip(self.modules.iter_mut()) {
            *p = m.position();
        }
        positions
    }

    fn reset_limiters(&mut self) {
        self.trans_limiter.reset(Vector2::zeros());
        self.rot_limiter.reset(0.0);
    }

    /// Desaturate the states and send them to the modules.
    ///
    /// Every module is commanded even if an earlier one fails, the first error is returned.
    fn apply_states(
        &mut self,
        states: &mut [ModuleState; NUM_MODULES],
        hold_when_slow: bool,
    ) -> Result<(), DrivetrainError> {
        self.report.desat_factor =
            SwerveKinematics::desaturate(states, self.params.max_module_speed_ms);

        let mut result = Ok(());
        for (m, s) in self.modules.iter_mut().zip(states.iter()) {
            if let Err(e) = m.set_desired_state(*s, hold_when_slow) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }

        result
    }

    fn status_str(&self) -> String {
        let fallback: Vec<&str> = self
            .modules
            .iter()
            .zip(self.report.steer_fallback.iter())
            .filter(|(_, f)| **f)
            .map(|(m, _)| m.name())
            .collect();

        match (fallback.is_empty(), self.report.gyro_dropout) {
            (true, false) => "OK".into(),
            (true, true) => "GYRO DROPOUT".into(),
            (false, gyro) => format!(
                "STEER FALLBACK {}{}",
                fallback.join(" "),
                if gyro { ", GYRO DROPOUT" } else { "" }
            ),
        }
    }
}

impl Subsystem for Drivetrain {
    fn id(&self) -> SubsystemId {
        SubsystemId::Drivetrain
    }

    /// Integrate odometry and refresh the sensor estimates.
    fn periodic(&mut self, tick: &Tick) {
        self.dt_s = tick.dt_s;

        let positions = self.module_positions();

        let yaw = self.gyro.yaw_rad().ok().filter(|y| y.is_finite());
        match (yaw.is_some(), self.report.gyro_dropout) {
            (false, false) => warn!("Gyro yaw unavailable, integrating heading from the modules"),
            (false, true) => debug!("Gyro yaw still unavailable"),
            (true, true) => info!("Gyro yaw recovered"),
            (true, false) => (),
        }
        self.report.gyro_dropout = yaw.is_none();
        if yaw.is_none() {
            self.report.num_gyro_dropouts += 1;
        }

        self.odometry.update(&self.kinematics, yaw, &positions);

        if let Some(p) = self.gyro.pitch_rad().ok().filter(|p| p.is_finite()) {
            self.pitch_rad = p;
        }

        for (i, m) in self.modules.iter().enumerate() {
            let fallback = m.is_steer_fallback();
            if fallback && !self.report.steer_fallback[i] {
                warn!(
                    "{} steer angle unavailable, using last commanded angle",
                    m.name()
                );
            }
            self.report.steer_fallback[i] = fallback;
        }
    }

    fn publish(&self, sink: &mut dyn TelemetrySink) {
        let pose = self.pose();
        sink.publish_array(
            "drivetrain/pose",
            &[pose.x_m, pose.y_m, pose.heading_rad.to_degrees()],
        );

        let flatten = |states: [ModuleState; NUM_MODULES]| -> Vec<f64> {
            states
                .iter()
                .flat_map(|s| vec![s.speed_ms, s.angle_rad.to_degrees()])
                .collect()
        };
        sink.publish_array("drivetrain/desired_states", &flatten(self.desired_states()));
        sink.publish_array("drivetrain/measured_states", &flatten(self.module_states()));

        sink.publish_number("drivetrain/desat_factor", self.report.desat_factor);
        sink.publish_number("drivetrain/pitch_deg", self.pitch_rad.to_degrees());
        sink.publish_text("drivetrain/status", &self.status_str());
    }
}

impl DrivetrainLoopback {
    /// Integrate the drive velocities into distances.
    pub fn advance(&self, dt_s: f64) {
        for d in self.drive.iter() {
            d.advance(dt_s);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::drivetrain::test_params;
    use comms_if::{eqpt::EqptError, tm::TmTable};
    use std::f64::consts::FRAC_PI_2;

    const DT: f64 = 0.02;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn drivetrain() -> (Drivetrain, DrivetrainLoopback) {
        Drivetrain::loopback(test_params(), DT).unwrap()
    }

    fn tick(index: u64) -> Tick {
        Tick {
            index,
            time_s: index as f64 * DT,
            dt_s: DT,
        }
    }

    #[test]
    fn test_drive_forward() {
        let (mut dt, _) = drivetrain();
        dt.drive(1.0, 0.0, 0.0, false, false).unwrap();

        for s in dt.desired_states().iter() {
            assert!(close(s.speed_ms, 1.0));
            assert!(close(s.angle_rad, 0.0));
        }
        for s in dt.module_states().iter() {
            assert!(close(s.speed_ms, 1.0));
        }
        assert!(close(dt.chassis_speeds().vx_ms, 1.0));
    }

    #[test]
    fn test_rotate_in_place() {
        let (mut dt, _) = drivetrain();
        dt.drive(0.0, 0.0, 1.0, false, false).unwrap();

        let states = dt.desired_states();
        for (s, p) in states.iter().zip(dt.kinematics().positions().iter()) {
            assert!(s.speed_ms.abs() > 0.0);
            assert!(close(s.speed_ms.abs(), states[0].speed_ms.abs()));
            assert!(close(s.velocity().dot(p), 0.0));
        }
        assert!(close(dt.chassis_speeds().omega_rads, 1.0));
    }

    #[test]
    fn test_field_relative() {
        let (mut dt, _) = drivetrain();
        dt.reset_pose(Pose2D::new(0.0, 0.0, FRAC_PI_2));

        // Field +x while facing field +y means driving to the robot's right
        dt.drive(1.0, 0.0, 0.0, true, false).unwrap();
        for s in dt.desired_states().iter() {
            assert!(close(s.speed_ms, 1.0));
            assert!(close(s.angle_rad, -FRAC_PI_2));
        }
    }

    #[test]
    fn test_desaturation() {
        let (mut dt, _) = drivetrain();
        let max = dt.params().max_module_speed_ms;

        dt.drive(2.0 * max, 0.0, 1.0, false, false).unwrap();

        let fastest = dt
            .desired_states()
            .iter()
            .map(|s| s.speed_ms.abs())
            .fold(0.0, f64::max);
        assert!(close(fastest, max));
        assert!(dt.report().desat_factor < 1.0);
    }

    #[test]
    fn test_rate_limited() {
        let (mut dt, _) = drivetrain();
        let rate = dt.params().trans_slew_rate_mss;

        dt.drive(3.0, 0.0, 0.0, false, true).unwrap();
        assert!(close(dt.report().demand.vx_ms, rate * DT));
        dt.drive(3.0, 0.0, 0.0, false, true).unwrap();
        assert!(close(dt.report().demand.vx_ms, 2.0 * rate * DT));

        // Stopping clears the limiter
        dt.stop().unwrap();
        dt.drive(3.0, 0.0, 0.0, false, true).unwrap();
        assert!(close(dt.report().demand.vx_ms, rate * DT));
    }

    #[test]
    fn test_stop_holds_angles() {
        let (mut dt, rig) = drivetrain();
        dt.drive(0.0, 1.0, 0.0, false, false).unwrap();
        dt.stop().unwrap();

        for (s, d) in dt.desired_states().iter().zip(rig.drive.iter()) {
            assert!(close(s.speed_ms, 0.0));
            assert!(close(s.angle_rad, FRAC_PI_2));
            assert!(close(d.state().velocity, 0.0));
        }
    }

    #[test]
    fn test_set_x() {
        let (mut dt, _) = drivetrain();
        dt.set_x().unwrap();

        for (s, p) in dt
            .desired_states()
            .iter()
            .zip(dt.kinematics().positions().iter())
        {
            assert!(close(s.speed_ms, 0.0));

            // Wheel axis lies along the line to the centre
            assert!(close((s.angle_rad - p[1].atan2(p[0])).sin(), 0.0));
        }
    }

    #[test]
    fn test_invalid_demand() {
        let (mut dt, _) = drivetrain();
        assert!(matches!(
            dt.drive(f64::NAN, 0.0, 0.0, false, false),
            Err(DrivetrainError::InvalidDemand(..))
        ));
    }

    #[test]
    fn test_odometry_straight_line() {
        let (mut dt, rig) = drivetrain();

        for i in 0..50 {
            dt.drive(1.0, 0.0, 0.0, false, false).unwrap();
            rig.advance(DT);
            dt.periodic(&tick(i));
        }

        let pose = dt.pose();
        assert!((pose.x_m - 1.0).abs() < 1e-6);
        assert!(pose.y_m.abs() < 1e-6);
        assert!(pose.heading_rad.abs() < 1e-9);
    }

    #[test]
    fn test_sensor_dropouts() {
        let (mut dt, rig) = drivetrain();

        rig.gyro.with_state(|g| g.pitch_rad = 0.2);
        dt.periodic(&tick(0));
        assert!(close(dt.pitch(), 0.2));

        rig.gyro
            .with_state(|g| g.read_fault = Some(EqptError::NotResponding));
        rig.steer[0].with_state(|s| s.read_fault = Some(EqptError::NotResponding));
        dt.periodic(&tick(1));

        // Last good pitch kept
        assert!(close(dt.pitch(), 0.2));
        assert!(dt.report().gyro_dropout);
        assert_eq!(dt.report().num_gyro_dropouts, 1);
        assert!(dt.report().steer_fallback[0]);

        let mut tm = TmTable::new();
        dt.publish(&mut tm);
        assert_eq!(
            tm.get("drivetrain/status"),
            Some(&comms_if::tm::TmValue::Text(
                "STEER FALLBACK front_left, GYRO DROPOUT".into()
            ))
        );
    }

    #[test]
    fn test_zero_heading() {
        let (mut dt, rig) = drivetrain();
        rig.gyro.with_state(|g| g.raw_yaw_rad = 1.0);
        dt.reset_pose(Pose2D::new(2.0, 1.0, 1.0));
        dt.periodic(&tick(0));

        dt.zero_heading().unwrap();
        dt.periodic(&tick(1));

        let pose = dt.pose();
        assert!(close(pose.heading_rad, 0.0));
        assert!(close(pose.x_m, 2.0));
        assert!(close(rig.gyro.state().yaw_zero_rad, 1.0));
    }

    #[test]
    fn test_config_rejection_not_fatal() {
        let params = test_params();
        let steer = LoopbackPort::new();
        steer.with_state(|s| s.reject_settings = true);

        let port = |s: &LoopbackPort| ModulePorts {
            drive: Box::new(LoopbackPort::new()),
            steer: Box::new(s.clone()),
        };
        let res = Drivetrain::new(
            params,
            [port(&steer), port(&steer), port(&steer), port(&steer)],
            Box::new(LoopbackGyro::new()),
            DT,
        );
        assert!(res.is_ok());
    }
}
