//! # Robot Executable Parameters
//!
//! This module provides parameters for the robot executable's main loop.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecParams {
    /// Target period of one cycle.
    pub cycle_period_s: f64,

    /// Telemetry is published once every this many cycles.
    pub tm_decimation: u64,

    /// Number of consecutive overruns after which an error is raised.
    pub max_consec_overruns: u64,
}
