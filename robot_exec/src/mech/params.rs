//! Parameters structures for the mechanisms

use serde::Deserialize;

/// Parameters for all mechanisms.
#[derive(Debug, Clone, Deserialize)]
pub struct MechParams {
    pub elevator: JointParams,
    pub arm: JointParams,
    pub wrist: JointParams,
    pub turret: JointParams,
}

/// Parameters for one joint.
///
/// Positions are in the joint's port units, meters for the elevator and radians for the rest.
#[derive(Debug, Clone, Deserialize)]
pub struct JointParams {
    /// Lowest position the joint may be sent to.
    pub min_pos: f64,

    /// Highest position the joint may be sent to.
    pub max_pos: f64,

    /// Distance from the target within which the joint is considered there.
    pub tolerance: f64,

    /// Named stopping points, in any order.
    #[serde(default)]
    pub presets: Vec<f64>,

    /// The joint is continuous and `[min_pos, max_pos)` is one full turn. Targets outside the
    /// range are wrapped into it rather than clamped.
    #[serde(default)]
    pub wrap: bool,

    /// Closed loop slot used for the motion profile references.
    #[serde(default)]
    pub slot: u8,
}
