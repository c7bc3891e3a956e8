//! Balance on a tilting platform

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};
use ordered_float::OrderedFloat;
use std::collections::VecDeque;

use super::BalanceParams;
use crate::{
    robot::Robot,
    sched::{Requirements, SubsystemId, Task, TaskError, Tick},
};

// ------------------------------------------------------------------------------------------------
// DATA STRUCTURES
// ------------------------------------------------------------------------------------------------

/// Drives up a tilting platform until it tips over and settles.
///
/// While the pitch is outside tolerance the robot drives towards the high side at a speed
/// proportional to the pitch, otherwise it locks its wheels in an X. The pitch rate is median
/// filtered. The direction of travel is latched from the first filtered rate at least as large as
/// the settling threshold, so jitter before the climb is ignored. The task finishes once the
/// filtered rate has reversed against that direction (the platform has tipped) and then decayed
/// below the threshold (it has settled). Pitch crossing zero on its own does not finish the task.
pub struct Balance {
    params: BalanceParams,

    prev_pitch_deg: Option<f64>,
    rates: VecDeque<f64>,
    filtered_rate_degs: Option<f64>,

    /// Sign of the first filtered rate at or above the threshold.
    initial_sign: Option<f64>,

    /// The filtered rate has had the opposite sign to `initial_sign`.
    flipped: bool,

    finished: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Balance {
    pub fn new(params: &BalanceParams) -> Self {
        Self {
            params: params.clone(),
            prev_pitch_deg: None,
            rates: VecDeque::with_capacity(params.window.max(1)),
            filtered_rate_degs: None,
            initial_sign: None,
            flipped: false,
            finished: false,
        }
    }

    pub fn filtered_rate(&self) -> Option<f64> {
        self.filtered_rate_degs
    }

    pub fn has_flipped(&self) -> bool {
        self.flipped
    }

    /// Add a pitch sample, updating the filtered rate and the stop condition.
    fn update(&mut self, pitch_deg: f64, dt_s: f64) {
        if let Some(prev) = self.prev_pitch_deg {
            if dt_s > 0.0 {
                self.rates.push_back((pitch_deg - prev) / dt_s);
                while self.rates.len() > self.params.window.max(1) {
                    self.rates.pop_front();
                }
                self.filtered_rate_degs = median(&self.rates);
            }
        }
        self.prev_pitch_deg = Some(pitch_deg);

        let rate = match self.filtered_rate_degs {
            Some(r) if r != 0.0 => r,
            _ => return,
        };

        match self.initial_sign {
            None if rate.abs() >= self.params.rate_threshold_degs => {
                self.initial_sign = Some(rate.signum())
            }
            Some(s) if s != rate.signum() && !self.flipped => {
                info!("Balance: platform tipping (rate {:.1} deg/s)", rate);
                self.flipped = true;
            }
            _ => (),
        }

        if self.flipped && rate.abs() < self.params.rate_threshold_degs {
            self.finished = true;
        }
    }
}

impl Task<Robot> for Balance {
    fn name(&self) -> &str {
        "Balance"
    }

    fn requirements(&self) -> Requirements {
        SubsystemId::Drivetrain.into()
    }

    fn step(&mut self, robot: &mut Robot, tick: &Tick) -> Result<(), TaskError> {
        let pitch_deg = robot.drivetrain.pitch().to_degrees();
        self.update(pitch_deg, tick.dt_s);

        if pitch_deg.abs() > self.params.tolerance_deg && !self.finished {
            let max = self.params.max_speed_ms.abs();
            let vx_ms = (self.params.k_ff * pitch_deg).clamp(-max, max);
            robot.drivetrain.drive(vx_ms, 0.0, 0.0, false, false)?;
        } else {
            robot.drivetrain.set_x()?;
        }

        Ok(())
    }

    fn is_done(&self, _robot: &Robot, _tick: &Tick) -> bool {
        self.finished
    }

    fn stop(&mut self, robot: &mut Robot, _tick: &Tick, interrupted: bool) {
        if !interrupted {
            info!("Balanced");
        }
        if let Err(e) = robot.drivetrain.set_x() {
            warn!("Balance could not lock the wheels: {}", e);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn median(values: &VecDeque<f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by_key(|v| OrderedFloat(*v));

    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
