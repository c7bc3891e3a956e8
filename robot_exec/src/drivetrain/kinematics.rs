//! Swerve kinematics
//!
//! Forward kinematics maps a chassis velocity onto the four module velocities, each module moving
//! with the chassis translational velocity plus the contribution `omega x r` of the chassis
//! rotation at that module's position. The inverse is overdetermined (eight equations, three
//! unknowns) and is solved in the least squares sense, which is also how odometry recovers the
//! chassis motion from the measured module displacements.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Matrix3, Rotation2, Vector2, Vector3};
use serde::Serialize;
use util::maths::{ang_dist, wrap_pi};

use super::{DrivetrainError, NUM_MODULES};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Velocity of the robot.
///
/// Frame: Robot body
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ChassisSpeeds {
    /// Forward velocity, meters/second.
    pub vx_ms: f64,

    /// Leftward velocity, meters/second.
    pub vy_ms: f64,

    /// Anticlockwise rotation rate, radians/second.
    pub omega_rads: f64,
}

/// Target or measured state of one module.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ModuleState {
    /// Wheel speed, meters/second. May be negative.
    pub speed_ms: f64,

    /// Wheel angle from the robot body x axis, radians.
    pub angle_rad: f64,
}

/// Odometry sample from one module.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ModulePosition {
    /// Distance travelled by the wheel, meters.
    pub distance_m: f64,

    /// Wheel angle from the robot body x axis, radians.
    pub angle_rad: f64,
}

/// Motion of the robot over one odometry step.
///
/// Frame: Robot body at the start of the step
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct Twist2 {
    pub dx_m: f64,
    pub dy_m: f64,
    pub dtheta_rad: f64,
}

/// Swerve kinematics for a fixed module geometry.
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    /// Module positions in the robot body frame.
    positions: [Vector2<f64>; NUM_MODULES],

    /// Inverse of the least squares normal matrix `A^T A`.
    inv_normal: Matrix3<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl ChassisSpeeds {
    pub fn new(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
        }
    }

    /// Build robot relative speeds from a field relative demand, given the robot's heading.
    pub fn from_field_relative(vx_ms: f64, vy_ms: f64, omega_rads: f64, heading_rad: f64) -> Self {
        let v_rb = Rotation2::new(-heading_rad) * Vector2::new(vx_ms, vy_ms);
        Self::new(v_rb[0], v_rb[1], omega_rads)
    }

    pub fn is_finite(&self) -> bool {
        self.vx_ms.is_finite() && self.vy_ms.is_finite() && self.omega_rads.is_finite()
    }
}

impl ModuleState {
    pub fn new(speed_ms: f64, angle_rad: f64) -> Self {
        Self {
            speed_ms,
            angle_rad,
        }
    }

    /// Build a state from a module velocity vector. A zero vector gives a zero angle.
    pub fn from_vector(v: Vector2<f64>) -> Self {
        let speed_ms = v.norm();
        if speed_ms == 0.0 {
            Self::new(0.0, 0.0)
        } else {
            Self::new(speed_ms, v[1].atan2(v[0]))
        }
    }

    /// Velocity of the wheel contact point.
    pub fn velocity(&self) -> Vector2<f64> {
        Vector2::new(self.angle_rad.cos(), self.angle_rad.sin()) * self.speed_ms
    }

    /// Give the equivalent state which needs the module to steer through at most a quarter turn
    /// from `current_angle_rad`.
    ///
    /// Reversing the wheel and turning it half way round gives the same contact velocity, so if
    /// the shortest path to the target is more than 90 degrees the reverse is commanded instead.
    pub fn optimise(self, current_angle_rad: f64) -> Self {
        if ang_dist(current_angle_rad, self.angle_rad).abs() > std::f64::consts::FRAC_PI_2 {
            Self::new(-self.speed_ms, wrap_pi(self.angle_rad + std::f64::consts::PI))
        } else {
            self
        }
    }
}

impl ModulePosition {
    pub fn new(distance_m: f64, angle_rad: f64) -> Self {
        Self {
            distance_m,
            angle_rad,
        }
    }
}

impl SwerveKinematics {
    /// Create kinematics for modules at the given body frame positions.
    pub fn new(module_pos_m_rb: &[[f64; 2]; NUM_MODULES]) -> Result<Self, DrivetrainError> {
        let mut positions = [Vector2::zeros(); NUM_MODULES];
        for (p, raw) in positions.iter_mut().zip(module_pos_m_rb.iter()) {
            if !raw[0].is_finite() || !raw[1].is_finite() {
                return Err(DrivetrainError::DegenerateGeometry);
            }
            *p = Vector2::new(raw[0], raw[1]);
        }

        // Normal matrix of the stacked rows [1, 0, -y_i] and [0, 1, x_i], singular when every
        // module sits at the same point
        let n = NUM_MODULES as f64;
        let sum_x: f64 = positions.iter().map(|p| p[0]).sum();
        let sum_y: f64 = positions.iter().map(|p| p[1]).sum();
        let sum_r2: f64 = positions.iter().map(|p| p.norm_squared()).sum();
        #[rustfmt::skip]
        let normal = Matrix3::new(
            n, 0.0, -sum_y,
            0.0, n, sum_x,
            -sum_y, sum_x, sum_r2,
        );

        if normal.determinant().abs() < 1e-9 {
            return Err(DrivetrainError::DegenerateGeometry);
        }
        let inv_normal = normal
            .try_inverse()
            .ok_or(DrivetrainError::DegenerateGeometry)?;

        Ok(Self {
            positions,
            inv_normal,
        })
    }

    /// Module positions in the robot body frame.
    pub fn positions(&self) -> &[Vector2<f64>; NUM_MODULES] {
        &self.positions
    }

    /// Velocity of each module for the given chassis speeds.
    pub fn module_vectors(&self, speeds: &ChassisSpeeds) -> [Vector2<f64>; NUM_MODULES] {
        let mut vectors = [Vector2::zeros(); NUM_MODULES];
        for (v, p) in vectors.iter_mut().zip(self.positions.iter()) {
            *v = Vector2::new(
                speeds.vx_ms - speeds.omega_rads * p[1],
                speeds.vy_ms + speeds.omega_rads * p[0],
            );
        }
        vectors
    }

    /// Module states for the given chassis speeds. Modules with zero velocity get a zero angle.
    pub fn to_module_states(&self, speeds: &ChassisSpeeds) -> [ModuleState; NUM_MODULES] {
        let mut states = [ModuleState::default(); NUM_MODULES];
        for (s, v) in states.iter_mut().zip(self.module_vectors(speeds).iter()) {
            *s = ModuleState::from_vector(*v);
        }
        states
    }

    /// Least squares chassis speeds which best explain the given module states.
    pub fn to_chassis_speeds(&self, states: &[ModuleState; NUM_MODULES]) -> ChassisSpeeds {
        let mut vectors = [Vector2::zeros(); NUM_MODULES];
        for (v, s) in vectors.iter_mut().zip(states.iter()) {
            *v = s.velocity();
        }

        let x = self.solve(&vectors);
        ChassisSpeeds::new(x[0], x[1], x[2])
    }

    /// Least squares chassis motion which best explains the given module displacements.
    pub fn to_twist(&self, deltas: &[ModulePosition; NUM_MODULES]) -> Twist2 {
        let mut vectors = [Vector2::zeros(); NUM_MODULES];
        for (v, d) in vectors.iter_mut().zip(deltas.iter()) {
            *v = Vector2::new(d.angle_rad.cos(), d.angle_rad.sin()) * d.distance_m;
        }

        let x = self.solve(&vectors);
        Twist2 {
            dx_m: x[0],
            dy_m: x[1],
            dtheta_rad: x[2],
        }
    }

    /// Scale every module speed by the same factor so none exceeds `max_speed_ms`.
    ///
    /// Returns the factor applied, 1 if no module was over the limit.
    pub fn desaturate(states: &mut [ModuleState; NUM_MODULES], max_speed_ms: f64) -> f64 {
        let fastest = states
            .iter()
            .map(|s| s.speed_ms.abs())
            .fold(0.0, f64::max);

        if fastest <= max_speed_ms || fastest == 0.0 {
            return 1.0;
        }

        let factor = max_speed_ms / fastest;
        for s in states.iter_mut() {
            s.speed_ms *= factor;
        }
        factor
    }

    /// Solve `A^T A x = A^T b` for the stacked module vectors `b`.
    fn solve(&self, vectors: &[Vector2<f64>; NUM_MODULES]) -> Vector3<f64> {
        let mut atb = Vector3::zeros();
        for (v, p) in vectors.iter().zip(self.positions.iter()) {
            atb[0] += v[0];
            atb[1] += v[1];
            atb[2] += -p[1] * v[0] + p[0] * v[1];
        }
        self.inv_normal * atb
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    const SQUARE: [[f64; 2]; NUM_MODULES] = [[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]];

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_forward_drive() {
        let kin = SwerveKinematics::new(&SQUARE).unwrap();
        let states = kin.to_module_states(&ChassisSpeeds::new(1.0, 0.0, 0.0));

        for s in states.iter() {
            assert!(close(s.speed_ms, 1.0));
            assert!(close(s.angle_rad, 0.0));
        }
    }

    #[test]
    fn test_pure_rotation_is_tangential() {
        let kin = SwerveKinematics::new(&SQUARE).unwrap();
        let states = kin.to_module_states(&ChassisSpeeds::new(0.0, 0.0, 1.0));

        let expected_speed = (0.3f64 * 0.3 * 2.0).sqrt();
        for (s, p) in states.iter().zip(kin.positions().iter()) {
            assert!(close(s.speed_ms, expected_speed));
            assert!(close(s.velocity().dot(p), 0.0));

            // Anticlockwise rotation, so the velocity is 90 degrees ahead of the position
            assert!(close(ang_dist(p[1].atan2(p[0]), s.angle_rad), FRAC_PI_2));
        }
    }

    #[test]
    fn test_round_trip() {
        // Rectangular, off-centre geometry to make sure nothing relies on symmetry
        let kin = SwerveKinematics::new(&[[0.4, 0.25], [0.4, -0.25], [-0.2, 0.25], [-0.2, -0.25]])
            .unwrap();

        for speeds in [
            ChassisSpeeds::new(1.0, 0.0, 0.0),
            ChassisSpeeds::new(0.3, -0.7, 1.2),
            ChassisSpeeds::new(0.0, 0.0, -2.0),
            ChassisSpeeds::new(-1.5, 2.0, 0.4),
        ]
        .iter()
        {
            let back = kin.to_chassis_speeds(&kin.to_module_states(speeds));
            assert!(close(back.vx_ms, speeds.vx_ms));
            assert!(close(back.vy_ms, speeds.vy_ms));
            assert!(close(back.omega_rads, speeds.omega_rads));
        }
    }

    #[test]
    fn test_desaturate() {
        let kin = SwerveKinematics::new(&SQUARE).unwrap();
        let mut states = kin.to_module_states(&ChassisSpeeds::new(3.0, 1.0, 4.0));
        let before = states;

        let factor = SwerveKinematics::desaturate(&mut states, 2.0);
        assert!(factor < 1.0);

        let fastest = states.iter().map(|s| s.speed_ms.abs()).fold(0.0, f64::max);
        assert!(close(fastest, 2.0));

        for (a, b) in states.iter().zip(before.iter()) {
            assert!(a.speed_ms.abs() <= 2.0 + 1e-12);
            assert!(close(a.speed_ms, b.speed_ms * factor));
            assert_eq!(a.angle_rad, b.angle_rad);
        }

        // Direction of motion of the chassis is preserved
        let c0 = kin.to_chassis_speeds(&before);
        let c1 = kin.to_chassis_speeds(&states);
        assert!(close(c1.vx_ms / c0.vx_ms, factor));
        assert!(close(c1.vy_ms / c0.vy_ms, factor));
        assert!(close(c1.omega_rads / c0.omega_rads, factor));

        // Nothing to do when within limits
        let mut slow = kin.to_module_states(&ChassisSpeeds::new(0.5, 0.0, 0.0));
        assert_eq!(SwerveKinematics::desaturate(&mut slow, 2.0), 1.0);
        assert!(close(slow[0].speed_ms, 0.5));
    }

    #[test]
    fn test_optimise_preserves_velocity() {
        for i in 0..36 {
            for j in 0..36 {
                let target = ModuleState::new(1.3, -PI + i as f64 * PI / 18.0);
                let current = -PI + j as f64 * PI / 18.0 + 0.01;

                let opt = target.optimise(current);

                assert!((opt.velocity() - target.velocity()).norm() < 1e-9);
                assert!(ang_dist(current, opt.angle_rad).abs() <= FRAC_PI_2 + 1e-9);
            }
        }

        let opt = ModuleState::new(1.0, 170f64.to_radians()).optimise(0.0);
        assert!(close(opt.speed_ms, -1.0));
        assert!(close(opt.angle_rad, -10f64.to_radians()));
    }

    #[test]
    fn test_field_relative() {
        // Facing +y on the field, a field +x demand is a rightward (negative y) body demand
        let s = ChassisSpeeds::from_field_relative(1.0, 0.0, 0.5, FRAC_PI_2);
        assert!(close(s.vx_ms, 0.0));
        assert!(close(s.vy_ms, -1.0));
        assert!(close(s.omega_rads, 0.5));
    }

    #[test]
    fn test_degenerate_geometry() {
        assert!(matches!(
            SwerveKinematics::new(&[[0.1, 0.1]; NUM_MODULES]),
            Err(DrivetrainError::DegenerateGeometry)
        ));
    }
}
