//! Discrete PID controller turning a line-sensor reading into a turn value.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::KinematicsError;
use crate::limit;

/// Largest turn magnitude the controller will produce.
pub const TURN_LIMIT: f64 = 200.0;

/// Proportional, integral and derivative gains.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
}

impl PidGains {
    /// Construct a gain set.
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        PidGains { kp, ki, kd }
    }
}

impl fmt::Display for PidGains {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(kp: {:.3}, ki: {:.3}, kd: {:.3})", self.kp, self.ki, self.kd)
    }
}

/// PID line controller with a two-slot error history and a trapezoidal integrator.
///
/// Every instance owns its own state. Line-trace phases that track different
/// target values each get their own controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PidController {
    gains: PidGains,
    /// Fixed sample period in seconds.
    dt: f64,
    previous: f64,
    current: f64,
    integral: f64,
}

impl PidController {
    /// Construct a controller in the reset state.
    ///
    /// # Arguments
    ///
    /// * `gains`: Controller gains.
    /// * `dt`: Sample period in seconds, the tick period of the control loop.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidSamplePeriod)` if `dt` is not a positive, finite number.
    pub fn new(gains: PidGains, dt: f64) -> Result<Self, KinematicsError> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(KinematicsError::InvalidSamplePeriod("must be positive and finite"));
        }
        Ok(PidController {
            gains,
            dt,
            previous: 0.0,
            current: 0.0,
            integral: 0.0,
        })
    }

    /// Returns the gains.
    pub fn gains(&self) -> PidGains {
        self.gains
    }

    /// Returns the sample period in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Returns the accumulated integral.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Returns the `(previous, current)` error pair.
    pub fn errors(&self) -> (f64, f64) {
        (self.previous, self.current)
    }

    /// Clear both error slots and the integral.
    pub fn reset(&mut self) {
        self.previous = 0.0;
        self.current = 0.0;
        self.integral = 0.0;
    }

    /// Run one controller step and return the turn value.
    ///
    /// The error is `sensor - target`, so a reading above target turns right.
    /// The result is clamped to `[-200, 200]` and rounded to the nearest integer.
    pub fn update(&mut self, sensor: f64, target: f64) -> i16 {
        self.previous = self.current;
        self.current = sensor - target;
        self.integral += (self.current + self.previous) / 2.0 * self.dt;

        let p = self.gains.kp * self.current;
        let i = self.gains.ki * self.integral;
        let d = self.gains.kd * (self.current - self.previous) / self.dt;

        libm::round(limit(p + i + d, -TURN_LIMIT, TURN_LIMIT)) as i16
    }
}
