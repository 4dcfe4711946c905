//! Differential-drive steering: `(power, turn)` to per-wheel power.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Power range accepted by the motors.
pub const POWER_LIMIT: i32 = 100;
/// Turn range accepted by the steering mapper.
pub const TURN_LIMIT: i32 = 200;

/// Which side of the course the robot runs on.
///
/// The right course is the mirror image of the left one, so every turn
/// (and every heading target) flips sign.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CourseOrientation {
    /// Left course, turns are used as given.
    #[default]
    Left,
    /// Right course, turns are mirrored.
    Right,
}

impl CourseOrientation {
    /// `1` for the left course, `-1` for the right course.
    pub const fn sign(self) -> i32 {
        match self {
            CourseOrientation::Left => 1,
            CourseOrientation::Right => -1,
        }
    }
}

/// A clamped `(power, turn)` pair, the only message handed to the actuators.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionCommand {
    /// Forward power in `[-100, 100]`.
    pub power: i8,
    /// Steering in `[-200, 200]`, positive turns right.
    pub turn: i16,
}

impl MotionCommand {
    /// Both wheels braked.
    pub const STOP: MotionCommand = MotionCommand { power: 0, turn: 0 };

    /// Construct a command, clamping both values into range.
    pub fn new(power: i32, turn: i32) -> Self {
        MotionCommand {
            power: power.clamp(-POWER_LIMIT, POWER_LIMIT) as i8,
            turn: turn.clamp(-TURN_LIMIT, TURN_LIMIT) as i16,
        }
    }

    /// Whether this command brakes both wheels.
    pub fn is_stop(&self) -> bool {
        self.power == 0 && self.turn == 0
    }

    /// Recover `(power, turn)` from the powers reported by the two motors.
    ///
    /// The faster wheel is taken as the power and the difference as a
    /// percentage of it as the turn. A zero divisor reports no turn.
    pub fn from_wheels(left: i8, right: i8) -> Self {
        let (l, r) = (i32::from(left), i32::from(right));
        if l == r {
            MotionCommand::new(l, 0)
        } else if l > r {
            let turn = if l == 0 { 0 } else { (l - r) * 100 / l };
            MotionCommand::new(l, turn)
        } else {
            let turn = if r == 0 { 0 } else { -((r - l) * 100 / r) };
            MotionCommand::new(r, turn)
        }
    }
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(power: {}, turn: {})", self.power, self.turn)
    }
}

/// Output for a single wheel.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelOutput {
    /// Drive with the given power.
    Power(i8),
    /// Actively brake, as opposed to coasting at zero power.
    Brake,
}

impl WheelOutput {
    /// Power applied to the wheel, zero when braking.
    pub fn power(self) -> i8 {
        match self {
            WheelOutput::Power(p) => p,
            WheelOutput::Brake => 0,
        }
    }
}

/// Setpoints for both drive wheels.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelCommand {
    /// Left wheel output.
    pub left: WheelOutput,
    /// Right wheel output.
    pub right: WheelOutput,
}

impl WheelCommand {
    /// Brake both wheels.
    pub const BRAKE: WheelCommand = WheelCommand {
        left: WheelOutput::Brake,
        right: WheelOutput::Brake,
    };

    /// Drive both wheels with plain power values.
    pub const fn powers(left: i8, right: i8) -> Self {
        WheelCommand {
            left: WheelOutput::Power(left),
            right: WheelOutput::Power(right),
        }
    }
}

impl fmt::Display for WheelCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.left, self.right) {
            (WheelOutput::Brake, WheelOutput::Brake) => write!(f, "(brake)"),
            (l, r) => write!(f, "(L: {}, R: {})", l.power(), r.power()),
        }
    }
}

/// Maps `(power, turn)` onto the two wheels of a differential drive.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SteeringMapper {
    orientation: CourseOrientation,
}

impl SteeringMapper {
    /// Construct a mapper for the given course side.
    pub const fn new(orientation: CourseOrientation) -> Self {
        SteeringMapper { orientation }
    }

    /// Returns the course side.
    pub fn orientation(&self) -> CourseOrientation {
        self.orientation
    }

    /// Apply the course mirroring to a turn value or heading.
    pub fn mirror(&self, turn: i32) -> i32 {
        turn * self.orientation.sign()
    }

    /// Mirror, clamp and map a requested `(power, turn)`.
    ///
    /// Returns the command as it was actually applied together with the
    /// wheel setpoints.
    ///
    /// # Examples
    ///
    /// * `steer(100, 100)` gives `(L 100, R 0)`, pivoting around the right wheel.
    /// * `steer(100, 200)` gives `(L 100, R -100)`, spinning in place.
    /// * `steer(50, 50)` gives `(L 50, R 25)`, a gentle right curve.
    pub fn steer(&self, power: i32, turn: i32) -> (MotionCommand, WheelCommand) {
        let command = MotionCommand::new(power, self.mirror(turn));
        (command, Self::map(command))
    }

    /// Map an already clamped command onto the wheels, without mirroring.
    pub fn map(command: MotionCommand) -> WheelCommand {
        let power = i32::from(command.power);
        let turn = i32::from(command.turn);

        if power != 0 && turn == 0 {
            WheelCommand::powers(command.power, command.power)
        } else if turn > 0 {
            WheelCommand::powers(command.power, (power - turn * power / 100) as i8)
        } else if turn < 0 {
            WheelCommand::powers((power + turn * power / 100) as i8, command.power)
        } else {
            WheelCommand::BRAKE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheels(power: i32, turn: i32) -> WheelCommand {
        SteeringMapper::new(CourseOrientation::Left).steer(power, turn).1
    }

    #[test]
    fn test_straight() {
        assert_eq!(wheels(60, 0), WheelCommand::powers(60, 60));
        assert_eq!(wheels(-30, 0), WheelCommand::powers(-30, -30));
    }

    #[test]
    fn test_right_turns() {
        assert_eq!(wheels(100, 100), WheelCommand::powers(100, 0));
        assert_eq!(wheels(100, 200), WheelCommand::powers(100, -100));
        assert_eq!(wheels(50, 50), WheelCommand::powers(50, 25));
    }

    #[test]
    fn test_left_turns() {
        assert_eq!(wheels(100, -100), WheelCommand::powers(0, 100));
        assert_eq!(wheels(50, -50), WheelCommand::powers(25, 50));
        assert_eq!(wheels(20, -200), WheelCommand::powers(-20, 20));
    }

    #[test]
    fn test_stop_brakes() {
        assert_eq!(wheels(0, 0), WheelCommand::BRAKE);
    }

    #[test]
    fn test_zero_power_with_turn_does_not_brake() {
        assert_eq!(wheels(0, 50), WheelCommand::powers(0, 0));
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mapper = SteeringMapper::new(CourseOrientation::Left);
        let (command, out) = mapper.steer(150, 300);
        assert_eq!(command, MotionCommand { power: 100, turn: 200 });
        assert_eq!(out, WheelCommand::powers(100, -100));
        let (command, _) = mapper.steer(-150, -300);
        assert_eq!(command, MotionCommand { power: -100, turn: -200 });
    }

    #[test]
    fn test_right_course_mirrors_turn() {
        let mapper = SteeringMapper::new(CourseOrientation::Right);
        let (command, out) = mapper.steer(50, 50);
        assert_eq!(command.turn, -50);
        assert_eq!(out, WheelCommand::powers(25, 50));
        assert_eq!(mapper.mirror(30), -30);
    }

    #[test]
    fn test_from_wheels() {
        assert_eq!(MotionCommand::from_wheels(40, 40), MotionCommand { power: 40, turn: 0 });
        assert_eq!(MotionCommand::from_wheels(100, 0), MotionCommand { power: 100, turn: 100 });
        assert_eq!(MotionCommand::from_wheels(100, -100), MotionCommand { power: 100, turn: 200 });
        assert_eq!(MotionCommand::from_wheels(25, 50), MotionCommand { power: 50, turn: -50 });
        assert_eq!(MotionCommand::from_wheels(0, -50), MotionCommand { power: 0, turn: 0 });
        assert!(MotionCommand::from_wheels(0, 0).is_stop());
    }
}
