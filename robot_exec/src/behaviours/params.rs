//! Parameters structures for the driving behaviours

use serde::{Deserialize, Serialize};

/// Parameters for all driving behaviours.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    pub rotate: RotateParams,
    pub strafe: StrafeParams,
    pub drive_to_point: DriveToPointParams,
    pub teleop: TeleopParams,
    pub balance: BalanceParams,
}

/// Gains of a PID controller.
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct PidGains {
    pub k_p: f64,

    #[serde(default)]
    pub k_i: f64,

    #[serde(default)]
    pub k_d: f64,

    /// Limit on the magnitude of the accumulated integral, unlimited if not given.
    #[serde(default)]
    pub integral_limit: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RotateParams {
    pub gains: PidGains,

    /// Heading error within which the rotation is considered complete, in radians.
    pub tolerance_rad: f64,

    /// Number of consecutive ticks within tolerance before the rotation finishes.
    pub settle_ticks: u32,

    /// Turn rate limit at the start of the rotation, in radians/second.
    pub initial_speed_rads: f64,

    /// Turn rate limit once the rotation is well under way, in radians/second.
    pub terminal_speed_rads: f64,

    /// Time after the start at which the rate limit is half way between the two, in seconds.
    pub transition_s: f64,

    /// How sharply the rate limit moves between the two.
    pub steepness: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrafeParams {
    /// Gains from bearing error in degrees to strafe speed in meters/second.
    pub gains: PidGains,

    pub tolerance_deg: f64,
    pub settle_ticks: u32,
    pub max_speed_ms: f64,

    /// Smallest non-zero speed commanded, so the robot does not stall just short of the target.
    pub min_speed_ms: f64,

    /// Time the target may be out of view before the task gives up.
    pub lost_timeout_s: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriveToPointParams {
    /// Gains from distance in meters to speed in meters/second.
    pub gains: PidGains,

    pub tolerance_m: f64,
    pub max_speed_ms: f64,
    pub min_speed_ms: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeleopParams {
    /// Width of the deadband applied to every stick axis.
    pub deadband: f64,

    /// Fraction of the drivetrain's maximum speed a full stick deflection demands.
    pub speed_scale: f64,

    /// Fraction of the drivetrain's maximum turn rate a full stick deflection demands.
    pub turn_scale: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceParams {
    /// Pitch within which the robot is considered level, in degrees.
    pub tolerance_deg: f64,

    /// Speed demanded per degree of pitch, in meters/second/degree.
    pub k_ff: f64,

    pub max_speed_ms: f64,

    /// Number of pitch rate samples the median filter is taken over.
    pub window: usize,

    /// Filtered pitch rate below which the platform is considered settled, in degrees/second.
    pub rate_threshold_degs: f64,
}
