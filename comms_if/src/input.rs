//! # Operator input
//!
//! A snapshot of the operator's controller, taken once per cycle. Axes are normalised to
//! [-1, 1] and buttons are simple booleans. The same snapshot type is used for recorded
//! autonomous runs, so a playback file is just an ordered list of these.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of axes on the operator's controller.
pub const NUM_AXES: usize = 6;

/// Number of buttons on the operator's controller.
pub const NUM_BUTTONS: usize = 10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A snapshot of the operator's controller.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Axis values, indexed by [`Axis`].
    #[serde(default)]
    pub axes: [f64; NUM_AXES],

    /// Button states, indexed by [`Button`].
    #[serde(default)]
    pub buttons: [bool; NUM_BUTTONS],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Controller axes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    LeftX = 0,
    LeftY = 1,
    RightX = 2,
    RightY = 3,
    LeftTrigger = 4,
    RightTrigger = 5,
}

/// Controller buttons.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    A = 0,
    B = 1,
    X = 2,
    Y = 3,
    LeftBumper = 4,
    RightBumper = 5,
    Back = 6,
    Start = 7,
    LeftStick = 8,
    RightStick = 9,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl InputSnapshot {
    /// Get the value of an axis.
    pub fn axis(&self, axis: Axis) -> f64 {
        self.axes[axis as usize]
    }

    /// Get the state of a button.
    pub fn button(&self, button: Button) -> bool {
        self.buttons[button as usize]
    }

    /// Builder style setter for an axis value.
    pub fn with_axis(mut self, axis: Axis, value: f64) -> Self {
        self.axes[axis as usize] = value;
        self
    }

    /// Builder style setter for a button state.
    pub fn with_button(mut self, button: Button, pressed: bool) -> Self {
        self.buttons[button as usize] = pressed;
        self
    }

    /// Return a copy with every axis clamped into [-1, 1]. Values which are not finite are
    /// replaced with zero.
    pub fn sanitised(mut self) -> Self {
        for a in self.axes.iter_mut() {
            *a = if a.is_finite() { a.clamp(-1.0, 1.0) } else { 0.0 };
        }
        self
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
