//! Wheel-encoder odometry.
//!
//! Distance and heading are integrated from the per-tick change of the two
//! encoder counts. Both accumulators are free running: they are only reset by
//! [`Odometry::init`], never clamped or wrapped.

use core::f64::consts::PI;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::KinematicsError;

/// Number of ticks between two refreshes of the speed estimate.
pub const SPEED_WINDOW_TICKS: u32 = 20;

/// Raw encoder counts of both drive wheels, sampled once per tick.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderSample {
    /// Left wheel encoder count.
    pub left: i32,
    /// Right wheel encoder count.
    pub right: i32,
}

impl EncoderSample {
    /// Construct a new encoder sample.
    pub const fn new(left: i32, right: i32) -> Self {
        EncoderSample { left, right }
    }
}

/// Accumulated drive state, owned by the [`Odometry`] estimator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriveState {
    /// Cumulative distance since the last initialization, forward-positive.
    pub distance: f64,
    /// Cumulative heading in degrees since the last initialization, right-turn-positive.
    pub heading: f64,
    /// Left wheel tick delta of the last update.
    pub left_delta: i32,
    /// Right wheel tick delta of the last update.
    pub right_delta: i32,
}

impl fmt::Display for DriveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(distance: {:.1}, heading: {:.1} deg)", self.distance, self.heading)
    }
}

/// Encoder odometry for a differential-drive base.
///
/// Wheel diameter and tread share one length unit (the shipped configuration
/// uses millimeters); distance is reported in that unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Odometry {
    /// Wheel diameter.
    wheel_diameter: f64,
    /// Lateral distance between the wheel contact points.
    tread: f64,
    /// Wheel rotation in degrees per encoder tick.
    degrees_per_tick: f64,
    previous: EncoderSample,
    state: DriveState,
    left_step: f64,
    right_step: f64,
    speed: f64,
    speed_ticks: u32,
    speed_reference: f64,
}

impl Odometry {
    /// Construct a new odometry estimator.
    ///
    /// # Arguments
    ///
    /// * `wheel_diameter`: Diameter of the drive wheels.
    /// * `tread`: Distance between the contact points of the two drive wheels.
    /// * `degrees_per_tick`: Wheel rotation per encoder tick, `1.0` for encoders
    ///   reporting whole degrees.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidWheelDiameter)` if `wheel_diameter` is not positive.
    /// Returns `Err(KinematicsError::InvalidTread)` if `tread` is not positive.
    /// Returns `Err(KinematicsError::InvalidTickConversion)` if `degrees_per_tick` is not positive.
    pub fn new(wheel_diameter: f64, tread: f64, degrees_per_tick: f64) -> Result<Self, KinematicsError> {
        if !(wheel_diameter > 0.0) {
            return Err(KinematicsError::InvalidWheelDiameter("must be positive"));
        }
        if !(tread > 0.0) {
            return Err(KinematicsError::InvalidTread("must be positive"));
        }
        if !(degrees_per_tick > 0.0) {
            return Err(KinematicsError::InvalidTickConversion("must be positive"));
        }
        Ok(Odometry {
            wheel_diameter,
            tread,
            degrees_per_tick,
            previous: EncoderSample::default(),
            state: DriveState::default(),
            left_step: 0.0,
            right_step: 0.0,
            speed: 0.0,
            speed_ticks: 0,
            speed_reference: 0.0,
        })
    }

    /// Returns the wheel diameter.
    pub fn wheel_diameter(&self) -> f64 {
        self.wheel_diameter
    }

    /// Returns the tread width.
    pub fn tread(&self) -> f64 {
        self.tread
    }

    /// Zero distance and heading and take `baseline` as the new reference counts.
    ///
    /// Motion measured after this call is relative to the robot's position at
    /// the time of the call, independent of anything that happened before.
    pub fn init(&mut self, baseline: EncoderSample) {
        self.previous = baseline;
        self.state = DriveState::default();
        self.left_step = 0.0;
        self.right_step = 0.0;
        self.speed = 0.0;
        self.speed_ticks = 0;
        self.speed_reference = 0.0;
    }

    /// Integrate one tick worth of encoder motion.
    ///
    /// The previous counts are always replaced by `sample`, so every call
    /// consumes exactly the motion since the call before it.
    pub fn update(&mut self, sample: EncoderSample) -> DriveState {
        let left_delta = i64::from(sample.left) - i64::from(self.previous.left);
        let right_delta = i64::from(sample.right) - i64::from(self.previous.right);

        self.left_step = self.wheel_distance(left_delta as f64);
        self.right_step = self.wheel_distance(right_delta as f64);

        self.state.distance += (self.left_step + self.right_step) / 2.0;
        self.state.heading += (360.0 / (2.0 * PI * self.tread)) * (self.left_step - self.right_step);
        self.state.left_delta = sample.left.wrapping_sub(self.previous.left);
        self.state.right_delta = sample.right.wrapping_sub(self.previous.right);

        self.previous = sample;

        self.speed_ticks += 1;
        if self.speed_ticks >= SPEED_WINDOW_TICKS {
            self.speed = self.state.distance - self.speed_reference;
            self.speed_reference = self.state.distance;
            self.speed_ticks = 0;
        }

        self.state
    }

    fn wheel_distance(&self, ticks: f64) -> f64 {
        ((PI * self.wheel_diameter) / 360.0) * (ticks * self.degrees_per_tick)
    }

    /// Snapshot of the accumulated state.
    pub fn state(&self) -> DriveState {
        self.state
    }

    /// Cumulative distance since the last [`init`](Self::init).
    pub fn distance(&self) -> f64 {
        self.state.distance
    }

    /// Cumulative heading in degrees since the last [`init`](Self::init).
    pub fn heading(&self) -> f64 {
        self.state.heading
    }

    /// Distance covered by the left wheel during the last update.
    pub fn left_step(&self) -> f64 {
        self.left_step
    }

    /// Distance covered by the right wheel during the last update.
    pub fn right_step(&self) -> f64 {
        self.right_step
    }

    /// Distance covered during the last complete speed window of
    /// [`SPEED_WINDOW_TICKS`] ticks.
    pub fn speed(&self) -> f64 {
        self.speed
    }
}

impl fmt::Display for Odometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Odometry (d: {:.1}, tread: {:.1}) {}",
            self.wheel_diameter, self.tread, self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const EPSILON: f64 = 1e-9;

    fn odometry() -> Odometry {
        Odometry::new(100.0, 145.0, 1.0).unwrap()
    }

    #[test]
    fn test_constructor_invalid_parameters() {
        assert!(matches!(
            Odometry::new(0.0, 145.0, 1.0),
            Err(KinematicsError::InvalidWheelDiameter("must be positive"))
        ));
        assert!(matches!(
            Odometry::new(100.0, -1.0, 1.0),
            Err(KinematicsError::InvalidTread("must be positive"))
        ));
        assert!(matches!(
            Odometry::new(100.0, 145.0, 0.0),
            Err(KinematicsError::InvalidTickConversion("must be positive"))
        ));
        assert!(Odometry::new(f64::NAN, 145.0, 1.0).is_err());
    }

    #[test]
    fn test_straight_motion_has_no_heading_change() {
        let mut odom = odometry();
        odom.init(EncoderSample::new(0, 0));
        let state = odom.update(EncoderSample::new(36, 36));
        // (PI * 100 / 360) * 36 = 10 * PI
        assert!((state.distance - 10.0 * PI).abs() < EPSILON);
        assert!(state.heading.abs() < EPSILON);
        assert_eq!(state.left_delta, 36);
        assert_eq!(state.right_delta, 36);
    }

    #[test]
    fn test_left_faster_turns_right() {
        let mut odom = odometry();
        odom.init(EncoderSample::new(0, 0));
        let delta = 20.0;
        let state = odom.update(EncoderSample::new(20, 0));

        let wheel = (PI * 100.0 / 360.0) * delta;
        let expected_heading = (360.0 / (2.0 * PI * 145.0)) * wheel;
        assert!(state.heading > 0.0);
        assert!((state.heading - expected_heading).abs() < EPSILON);
        assert!((state.distance - wheel / 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_right_faster_turns_left() {
        let mut odom = odometry();
        odom.init(EncoderSample::new(0, 0));
        let state = odom.update(EncoderSample::new(0, 20));
        assert!(state.heading < 0.0);
    }

    #[test]
    fn test_updates_are_relative_to_previous_sample() {
        let mut odom = odometry();
        odom.init(EncoderSample::new(1000, 1000));
        odom.update(EncoderSample::new(1036, 1036));
        odom.update(EncoderSample::new(1072, 1072));
        // Two steps of 36 ticks, not one of 72 from zero plus 36 from 1000.
        assert!((odom.distance() - 20.0 * PI).abs() < EPSILON);
        assert!((odom.left_step() - 10.0 * PI).abs() < EPSILON);
        assert!((odom.right_step() - 10.0 * PI).abs() < EPSILON);
    }

    #[test]
    fn test_init_resets_accumulators_and_baseline() {
        let mut odom = odometry();
        odom.init(EncoderSample::new(0, 0));
        odom.update(EncoderSample::new(100, 50));
        assert!(odom.distance() > 0.0);
        assert!(odom.heading() > 0.0);

        odom.init(EncoderSample::new(100, 50));
        assert_eq!(odom.state(), DriveState::default());
        let state = odom.update(EncoderSample::new(100, 50));
        assert!(state.distance.abs() < EPSILON);
        assert!(state.heading.abs() < EPSILON);
    }

    #[test]
    fn test_heading_is_not_normalized() {
        let mut odom = odometry();
        odom.init(EncoderSample::new(0, 0));
        let mut left = 0;
        let mut right = 0;
        for _ in 0..100 {
            left += 100;
            right -= 100;
            odom.update(EncoderSample::new(left, right));
        }
        assert!(odom.heading() > 360.0);
    }

    #[test]
    fn test_backward_motion_is_negative() {
        let mut odom = odometry();
        odom.init(EncoderSample::new(0, 0));
        odom.update(EncoderSample::new(-36, -36));
        assert!((odom.distance() + 10.0 * PI).abs() < EPSILON);
    }

    #[test]
    fn test_tick_conversion_scales_distance() {
        let mut odom = Odometry::new(100.0, 145.0, 0.5).unwrap();
        odom.init(EncoderSample::new(0, 0));
        odom.update(EncoderSample::new(72, 72));
        assert!((odom.distance() - 10.0 * PI).abs() < EPSILON);
    }

    #[test]
    fn test_speed_window() {
        let mut odom = Odometry::new(360.0 / PI, 145.0, 1.0).unwrap();
        odom.init(EncoderSample::new(0, 0));
        for i in 1..SPEED_WINDOW_TICKS as i32 {
            odom.update(EncoderSample::new(i * 10, i * 10));
        }
        assert_eq!(odom.speed(), 0.0);
        let n = SPEED_WINDOW_TICKS as i32;
        odom.update(EncoderSample::new(n * 10, n * 10));
        assert!((odom.speed() - 200.0).abs() < 1e-6);
    }
}
