//! Rate limiter for integer actuator commands.
//!
//! Turns a step change of the commanded power or turn into a ramp of at most
//! `change_rate` per tick, so the wheels do not slip on sudden acceleration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One shaped channel.
///
/// The fractional state is kept in single precision; the integer output is
/// `floor` of the state while rising and `ceil` while falling.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Ramp {
    value: f32,
}

impl Ramp {
    /// A ramp resting at zero.
    pub const fn new() -> Self {
        Ramp { value: 0.0 }
    }

    /// The fractional state of the ramp.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Move one step toward `target` and return the value to command.
    ///
    /// # Arguments
    ///
    /// * `target`: Value the ramp is heading for.
    /// * `change_rate`: Maximum change per call.
    /// * `actual`: The value actually commanded on the previous tick. If it no
    ///   longer matches this ramp's rounded state, something drove the
    ///   actuator directly and the ramp restarts from `actual`.
    pub fn step(&mut self, target: i16, change_rate: f32, actual: i16) -> i16 {
        if actual < target {
            if libm::floorf(self.value) as i16 != actual {
                self.value = f32::from(actual);
            }
            self.value += change_rate;
            libm::floorf(self.value) as i16
        } else if actual > target {
            if libm::ceilf(self.value) as i16 != actual {
                self.value = f32::from(actual);
            }
            self.value -= change_rate;
            libm::ceilf(self.value) as i16
        } else {
            actual
        }
    }
}
