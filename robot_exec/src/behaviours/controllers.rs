//! # Controllers
//!
//! Single axis feedback controllers used by the driving behaviours.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use util::maths::{apply_floor, wrap_pi};

use super::PidGains;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// A PID controller.
///
/// The controller is given the time step on each call rather than measuring it, so the same
/// sequence of errors always gives the same outputs.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    gains: PidGains,

    /// If set the error is an angle and is wrapped into [-pi, pi) before use.
    continuous: bool,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// A PID controller on one axis with a tolerance and output limits.
#[derive(Debug, Serialize, Clone)]
pub struct AxisController {
    pid: PidController,

    tolerance: f64,

    /// Largest output magnitude.
    max_output: f64,

    /// Smallest non-zero output magnitude while outside tolerance.
    min_output: f64,

    /// Error passed to the last call of `calculate`.
    last_error: Option<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            continuous: false,
            prev_error: None,
            integral: 0.0,
        }
    }

    /// Create a controller whose error is an angle in radians.
    pub fn new_continuous(gains: PidGains) -> Self {
        Self {
            continuous: true,
            ..Self::new(gains)
        }
    }

    /// Get the value of the controller for the given error over a time step of `dt_s`.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        let error = if self.continuous {
            wrap_pi(error)
        } else {
            error
        };

        // With no time step there is no integral or derivative to accumulate, the first call
        // also has no derivative as there is no previous error to compare against
        let dt = Some(dt_s).filter(|t| *t > 0.0 && t.is_finite());

        if let Some(t) = dt {
            self.integral += error * t;
            if let Some(lim) = self.gains.integral_limit {
                self.integral = self.integral.clamp(-lim.abs(), lim.abs());
            }
        }

        let deriv = match (self.prev_error, dt) {
            (Some(e), Some(t)) => {
                let delta = if self.continuous {
                    wrap_pi(error - e)
                } else {
                    error - e
                };
                delta / t
            }
            _ => 0.0,
        };

        self.prev_error = Some(error);

        self.gains.k_p * error + self.gains.k_i * self.integral + self.gains.k_d * deriv
    }

    /// Forget the accumulated integral and previous error.
    pub fn reset(&mut self) {
        self.prev_error = None;
        self.integral = 0.0;
    }
}

impl AxisController {
    pub fn new(pid: PidController, tolerance: f64, max_output: f64, min_output: f64) -> Self {
        Self {
            pid,
            tolerance: tolerance.abs(),
            max_output: max_output.abs(),
            min_output: min_output.abs().min(max_output.abs()),
            last_error: None,
        }
    }

    /// Get the output for the given error.
    ///
    /// Inside the tolerance the raw controller output is used without the floor, so the axis
    /// can settle rather than dithering about the setpoint.
    pub fn calculate(&mut self, error: f64, dt_s: f64) -> f64 {
        let error = if self.pid.continuous {
            wrap_pi(error)
        } else {
            error
        };
        self.last_error = Some(error);

        let out = self
            .pid
            .get(error, dt_s)
            .clamp(-self.max_output, self.max_output);

        if self.within_tolerance(error) {
            out
        } else {
            apply_floor(out, self.min_output)
        }
    }

    /// True if the last error given was within tolerance.
    pub fn at_setpoint(&self) -> bool {
        self.last_error
            .map(|e| self.within_tolerance(e))
            .unwrap_or(false)
    }

    pub fn last_error(&self) -> Option<f64> {
        self.last_error
    }

    pub fn reset(&mut self) {
        self.pid.reset();
        self.last_error = None;
    }

    /// Change the output limit, for example to follow a time varying speed profile.
    pub fn set_max_output(&mut self, max_output: f64) {
        self.max_output = max_output.abs();
        self.min_output = self.min_output.min(self.max_output);
    }

    fn within_tolerance(&self, error: f64) -> bool {
        error.abs() <= self.tolerance
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
