//! Swerve odometry
//!
//! Each update the change in every module's distance, taken along its current angle, gives one
//! displacement vector per module. These are combined into the chassis motion with the least
//! squares inverse kinematics, the rotation is replaced by the gyro's change in yaw when two good
//! gyro readings are available, and the motion is applied to the pose assuming constant curvature
//! over the step.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use util::maths::{ang_dist, wrap_pi};

use super::{ModulePosition, SwerveKinematics, Twist2, NUM_MODULES};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Position and heading of the robot.
///
/// Frame: Field
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x_m: f64,
    pub y_m: f64,

    /// Heading in [-pi, pi), anticlockwise from the field x axis.
    pub heading_rad: f64,
}

/// Dead reckoning pose estimator.
#[derive(Debug, Clone)]
pub struct SwerveOdometry {
    pose: Pose2D,
    prev_positions: [ModulePosition; NUM_MODULES],
    prev_gyro_rad: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Pose2D {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            x_m,
            y_m,
            heading_rad: wrap_pi(heading_rad),
        }
    }

    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }

    /// Apply a body frame twist, moving along a constant curvature arc.
    pub fn exp(&self, twist: &Twist2) -> Pose2D {
        let dtheta = twist.dtheta_rad;

        // For small angles use the series expansion to avoid dividing by zero
        let (s, c) = if dtheta.abs() < 1e-9 {
            (1.0 - dtheta * dtheta / 6.0, dtheta / 2.0)
        } else {
            (dtheta.sin() / dtheta, (1.0 - dtheta.cos()) / dtheta)
        };

        let d_rb = Vector2::new(
            twist.dx_m * s - twist.dy_m * c,
            twist.dx_m * c + twist.dy_m * s,
        );
        let d_field = Rotation2::new(self.heading_rad) * d_rb;

        Pose2D::new(
            self.x_m + d_field[0],
            self.y_m + d_field[1],
            self.heading_rad + dtheta,
        )
    }
}

impl SwerveOdometry {
    /// Start estimating from `pose` with the modules currently at `positions`.
    pub fn new(pose: Pose2D, positions: &[ModulePosition; NUM_MODULES]) -> Self {
        Self {
            pose,
            prev_positions: *positions,
            prev_gyro_rad: None,
        }
    }

    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    /// Integrate one step of module and gyro readings.
    ///
    /// `gyro_rad` is `None` (or non-finite) if the gyro could not be read, in which case the
    /// rotation estimated from the modules is used.
    pub fn update(
        &mut self,
        kin: &SwerveKinematics,
        gyro_rad: Option<f64>,
        positions: &[ModulePosition; NUM_MODULES],
    ) -> Pose2D {
        let mut deltas = [ModulePosition::default(); NUM_MODULES];
        for ((d, curr), prev) in deltas
            .iter_mut()
            .zip(positions.iter())
            .zip(self.prev_positions.iter())
        {
            *d = ModulePosition::new(curr.distance_m - prev.distance_m, curr.angle_rad);
        }

        let mut twist = kin.to_twist(&deltas);

        let gyro_rad = gyro_rad.filter(|g| g.is_finite());
        if let (Some(curr), Some(prev)) = (gyro_rad, self.prev_gyro_rad) {
            twist.dtheta_rad = ang_dist(prev, curr);
        }

        self.pose = self.pose.exp(&twist);
        self.prev_positions = *positions;
        self.prev_gyro_rad = gyro_rad;

        self.pose
    }

    /// Jump the estimate to `pose`. The only way the pose changes other than by integration.
    pub fn reset(&mut self, pose: Pose2D, positions: &[ModulePosition; NUM_MODULES]) {
        self.pose = pose;
        self.prev_positions = *positions;
    }

    /// Forget the last gyro reading, so that the next update does not see a jump in yaw (for
    /// example after the gyro has been zeroed).
    pub fn forget_gyro(&mut self) {
        self.prev_gyro_rad = None;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
