//! Slew rate limiters for the drive demands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Limits how fast a scalar demand may change.
#[derive(Debug, Clone)]
pub struct SlewRateLimiter {
    /// Maximum change per second.
    rate: f64,
    prev: f64,
}

/// Limits how fast a 2D demand may change, bounding the magnitude of the change vector so the
/// demand moves straight towards its target.
#[derive(Debug, Clone)]
pub struct VectorSlewLimiter {
    /// Maximum change in magnitude per second.
    rate: f64,
    prev: Vector2<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl SlewRateLimiter {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.abs(),
            prev: 0.0,
        }
    }

    /// Move towards `input` by at most `rate * dt_s` and return the limited value.
    pub fn calculate(&mut self, input: f64, dt_s: f64) -> f64 {
        let max_delta = self.rate * dt_s.max(0.0);
        self.prev += (input - self.prev).clamp(-max_delta, max_delta);
        self.prev
    }

    /// Jump straight to `value`.
    pub fn reset(&mut self, value: f64) {
        self.prev = value;
    }

    pub fn value(&self) -> f64 {
        self.prev
    }
}

impl VectorSlewLimiter {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.abs(),
            prev: Vector2::zeros(),
        }
    }

    /// Move towards `input` by a vector of at most `rate * dt_s` length.
    pub fn calculate(&mut self, input: Vector2<f64>, dt_s: f64) -> Vector2<f64> {
        let max_delta = self.rate * dt_s.max(0.0);
        let mut delta = input - self.prev;

        let norm = delta.norm();
        if norm > max_delta {
            delta *= max_delta / norm;
        }

        self.prev += delta;
        self.prev
    }

    pub fn reset(&mut self, value: Vector2<f64>) {
        self.prev = value;
    }

    pub fn value(&self) -> Vector2<f64> {
        self.prev
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
