//! Parameters structure for the drivetrain

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use super::NUM_MODULES;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Parameters for the drivetrain.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- GEOMETRY ----
    /// Position of each module's steer axis in the robot body frame, in [`super::MODULE_NAMES`]
    /// order.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub module_pos_m_rb: [[f64; 2]; NUM_MODULES],

    /// Angle of each module's steer encoder zero relative to the robot body x axis.
    ///
    /// Units: radians
    pub str_offset_rad: [f64; NUM_MODULES],

    // ---- CAPABILITIES ----
    /// Maximum speed any single module can be driven at.
    ///
    /// Units: meters/second
    pub max_module_speed_ms: f64,

    /// Maximum translational speed demanded by the operator.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Maximum turn rate demanded by the operator.
    ///
    /// Units: radians/second
    pub max_turn_rate_rads: f64,

    /// Below this demanded speed a module keeps its current angle rather than steering.
    ///
    /// Units: meters/second
    pub min_steer_speed_ms: f64,

    // ---- RATE LIMITS ----
    /// Maximum rate of change of the translational velocity demand when rate limiting.
    ///
    /// Units: meters/second^2
    pub trans_slew_rate_mss: f64,

    /// Maximum rate of change of the turn rate demand when rate limiting.
    ///
    /// Units: radians/second^2
    pub rot_slew_rate_radss: f64,

    // ---- CONTROLLER SLOTS ----
    /// Closed loop slot used for the drive velocity references.
    pub drv_slot: u8,

    /// Closed loop slot used for the steer position references.
    pub str_slot: u8,
}
