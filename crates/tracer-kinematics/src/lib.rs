#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for the control math of a differential-drive line-trace robot."]
#![doc = ""]
#![doc = "This crate provides wheel-encoder odometry, a discrete PID line controller,"]
#![doc = "a rate limiter for actuator commands and the differential-drive steering mapper."]

pub mod error;
pub mod odometry;
pub mod pid;
pub mod ramp;
pub mod steering;

pub use error::KinematicsError;
pub use odometry::{DriveState, EncoderSample, Odometry};
pub use pid::{PidController, PidGains};
pub use ramp::Ramp;
pub use steering::{CourseOrientation, MotionCommand, SteeringMapper, WheelCommand, WheelOutput};

/// Clamp `n` into `[min, max]`.
///
/// Unlike [`f64::clamp`] this never panics, so it is safe to call with bounds
/// coming straight from configuration.
pub fn limit(n: f64, min: f64, max: f64) -> f64 {
    if n > max {
        max
    } else if n < min {
        min
    } else {
        n
    }
}
