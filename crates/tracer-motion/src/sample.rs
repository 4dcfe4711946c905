//! Sensor inputs consumed once per tick.

use serde::{Deserialize, Serialize};
use tracer_kinematics::{EncoderSample, MotionCommand};

/// Raw color sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u16,
    /// Green channel.
    pub g: u16,
    /// Blue channel.
    pub b: u16,
}

impl Rgb {
    /// Construct a color reading.
    pub const fn new(r: u16, g: u16, b: u16) -> Self {
        Rgb { r, g, b }
    }
}

/// Per-channel color bounds, all strict.
///
/// A reading crosses the threshold when every bound that is present holds.
/// A threshold without bounds matches any reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorThreshold {
    /// Red must be below this value.
    pub r_below: Option<u16>,
    /// Red must be above this value.
    pub r_above: Option<u16>,
    /// Green must be below this value.
    pub g_below: Option<u16>,
    /// Green must be above this value.
    pub g_above: Option<u16>,
    /// Blue must be below this value.
    pub b_below: Option<u16>,
    /// Blue must be above this value.
    pub b_above: Option<u16>,
}

impl ColorThreshold {
    /// The black guide line.
    pub const BLACK: ColorThreshold = ColorThreshold {
        r_below: Some(60),
        g_below: Some(90),
        b_below: Some(90),
        r_above: None,
        g_above: None,
        b_above: None,
    };

    /// Blue section markers.
    pub const BLUE: ColorThreshold = ColorThreshold {
        r_below: Some(75),
        g_below: Some(95),
        b_above: Some(120),
        r_above: None,
        g_above: None,
        b_below: None,
    };

    /// Whether `rgb` satisfies every bound.
    pub fn matches(&self, rgb: Rgb) -> bool {
        fn below(value: u16, bound: Option<u16>) -> bool {
            bound.is_none_or(|b| value < b)
        }
        fn above(value: u16, bound: Option<u16>) -> bool {
            bound.is_none_or(|b| value > b)
        }
        below(rgb.r, self.r_below)
            && above(rgb.r, self.r_above)
            && below(rgb.g, self.g_below)
            && above(rgb.g, self.g_above)
            && below(rgb.b, self.b_below)
            && above(rgb.b, self.b_above)
    }
}

/// Everything the control loop reads from the hardware in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorSample {
    /// Color sensor reading.
    pub rgb: Rgb,
    /// Rangefinder distance in centimeters.
    pub range_cm: i16,
    /// Absolute gyroscope angle in degrees.
    pub gyro_angle: i16,
    /// Drive wheel encoder counts.
    pub encoders: EncoderSample,
    /// Power the left and right motors report they are running at.
    pub wheel_power: [i8; 2],
    /// Operator stop input.
    pub abort: bool,
}

impl SensorSample {
    /// The `(power, turn)` pair the motors are actually running at.
    pub fn reported_command(&self) -> MotionCommand {
        MotionCommand::from_wheels(self.wheel_power[0], self.wheel_power[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_threshold() {
        assert!(ColorThreshold::BLACK.matches(Rgb::new(20, 30, 40)));
        assert!(!ColorThreshold::BLACK.matches(Rgb::new(60, 30, 40)));
        assert!(!ColorThreshold::BLACK.matches(Rgb::new(160, 170, 170)));
    }

    #[test]
    fn test_blue_threshold() {
        assert!(ColorThreshold::BLUE.matches(Rgb::new(40, 60, 150)));
        assert!(!ColorThreshold::BLUE.matches(Rgb::new(40, 60, 120)));
        assert!(!ColorThreshold::BLACK.matches(Rgb::new(40, 60, 150)));
    }

    #[test]
    fn test_empty_threshold_matches_anything() {
        assert!(ColorThreshold::default().matches(Rgb::new(0, 0, 0)));
        assert!(ColorThreshold::default().matches(Rgb::new(255, 255, 255)));
    }

    #[test]
    fn test_reported_command() {
        let sample = SensorSample {
            wheel_power: [50, 25],
            ..Default::default()
        };
        assert_eq!(sample.reported_command(), MotionCommand { power: 50, turn: 50 });
    }
}
