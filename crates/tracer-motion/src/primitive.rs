//! Motion primitives.
//!
//! A primitive is a small state object that is polled once per tick, after
//! [`DriveController::begin_tick`], until it reports [`MotionStatus::Done`].
//! It is started between ticks, so the motion of its first tick already
//! counts toward its target.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::drive::DriveController;
use crate::error::MotionError;
use crate::sample::{ColorThreshold, SensorSample};

/// Power change per tick used by the ramped primitives.
pub const RAMP_RATE: f32 = 0.1;

/// What a primitive should do, as written in a mission table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrimitiveSpec {
    /// Drive until the signed distance is covered, then ramp to a full stop.
    RunDistance {
        /// Power, its sign must match `distance`.
        power: i32,
        /// Turn held during the run.
        turn: i32,
        /// Signed distance to cover.
        distance: f64,
    },
    /// Drive with a fixed command until the signed distance is covered, without ramping.
    RunDistanceDirect {
        /// Power, its sign must match `distance`.
        power: i32,
        /// Turn held during the run.
        turn: i32,
        /// Signed distance to cover.
        distance: f64,
    },
    /// Turn until the heading has changed by `heading` degrees, then ramp to a full stop.
    RunHeading {
        /// Power, must not be zero.
        power: i32,
        /// Turn, its sign must match `heading`.
        turn: i32,
        /// Signed heading change in degrees.
        heading: f64,
    },
    /// Drive until the rangefinder reads at most `within_cm`, then ramp to a full stop.
    RunUntilObstacle {
        /// Power, must be positive.
        power: i32,
        /// Turn held during the run.
        turn: i32,
        /// Detection threshold in centimeters.
        within_cm: i16,
        /// Optional distance bound, `0` for none.
        #[serde(default)]
        max_distance: f64,
    },
    /// Brake the instant the color threshold is crossed.
    RunUntilLine {
        /// Color that ends the run.
        color: ColorThreshold,
        /// Command issued while no line is seen. Without one, whatever was
        /// commanded before keeps running.
        #[serde(default)]
        drive: Option<[i32; 2]>,
    },
    /// Issue a fixed command for a number of ticks.
    Hold {
        /// Power.
        #[serde(default)]
        power: i32,
        /// Turn.
        #[serde(default)]
        turn: i32,
        /// Number of ticks to hold.
        ticks: u32,
    },
}

impl PrimitiveSpec {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            PrimitiveSpec::RunDistance { .. } => "run_distance",
            PrimitiveSpec::RunDistanceDirect { .. } => "run_distance_direct",
            PrimitiveSpec::RunHeading { .. } => "run_heading",
            PrimitiveSpec::RunUntilObstacle { .. } => "run_until_obstacle",
            PrimitiveSpec::RunUntilLine { .. } => "run_until_line",
            PrimitiveSpec::Hold { .. } => "hold",
        }
    }

    /// Check that the sign combination makes sense.
    pub fn validate(&self) -> Result<(), MotionError> {
        let violation = |reason| MotionError::ContractViolation {
            primitive: self.name(),
            reason,
        };
        match *self {
            PrimitiveSpec::RunDistance { power, distance, .. }
            | PrimitiveSpec::RunDistanceDirect { power, distance, .. } => {
                if (power > 0 && distance > 0.0) || (power < 0 && distance < 0.0) {
                    Ok(())
                } else {
                    Err(violation("power and distance must be non-zero with the same sign"))
                }
            }
            PrimitiveSpec::RunHeading { power, turn, heading } => {
                if power != 0 && ((turn > 0 && heading > 0.0) || (turn < 0 && heading < 0.0)) {
                    Ok(())
                } else {
                    Err(violation("power must be non-zero, turn and heading must share a sign"))
                }
            }
            PrimitiveSpec::RunUntilObstacle {
                power, max_distance, ..
            } => {
                if power > 0 && max_distance >= 0.0 {
                    Ok(())
                } else {
                    Err(violation("power must be positive and max distance non-negative"))
                }
            }
            PrimitiveSpec::RunUntilLine { .. } | PrimitiveSpec::Hold { .. } => Ok(()),
        }
    }
}

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionStatus {
    /// Poll again next tick.
    Running,
    /// The primitive has finished.
    Done,
}

/// A running instance of a [`PrimitiveSpec`].
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    spec: PrimitiveSpec,
    reference: f64,
    ticks: u32,
}

impl Primitive {
    /// Validate `spec` and capture the reference distance or heading from
    /// `drive` as it stands now, before the next tick's odometry update.
    ///
    /// # Errors
    ///
    /// An inconsistent spec is logged and reported as
    /// [`MotionError::ContractViolation`]; no command is issued.
    pub fn start(spec: PrimitiveSpec, drive: &DriveController) -> Result<Self, MotionError> {
        if let Err(e) = spec.validate() {
            error!(primitive = spec.name(), "{e}");
            return Err(e);
        }
        let reference = match spec {
            PrimitiveSpec::RunHeading { .. } => drive.heading(),
            _ => drive.distance(),
        };
        debug!(primitive = spec.name(), reference, "primitive started");
        Ok(Primitive {
            spec,
            reference,
            ticks: 0,
        })
    }

    /// The spec this primitive runs.
    pub fn spec(&self) -> &PrimitiveSpec {
        &self.spec
    }

    /// Distance or heading the primitive measures its progress from.
    pub fn reference(&self) -> f64 {
        self.reference
    }

    /// Advance by one tick.
    pub fn poll(&mut self, drive: &mut DriveController, sample: &SensorSample) -> MotionStatus {
        let reference = self.reference;
        self.ticks += 1;

        let status = match self.spec {
            PrimitiveSpec::RunDistance { power, turn, distance } => {
                let reached = reached(drive.distance(), reference + distance, distance > 0.0);
                ramped_run(drive, power, turn, reached)
            }
            PrimitiveSpec::RunDistanceDirect { power, turn, distance } => {
                drive.steer(power, turn);
                if reached(drive.distance(), reference + distance, distance > 0.0) {
                    MotionStatus::Done
                } else {
                    MotionStatus::Running
                }
            }
            PrimitiveSpec::RunHeading { power, turn, heading } => {
                let sign = f64::from(drive.mapper().mirror(1));
                let target = reference + heading * sign;
                let reached = reached(drive.heading(), target, heading * sign > 0.0);
                ramped_run(drive, power, turn, reached)
            }
            PrimitiveSpec::RunUntilObstacle {
                power,
                turn,
                within_cm,
                max_distance,
            } => {
                let bounded = max_distance > 0.0 && drive.distance() >= reference + max_distance;
                ramped_run(drive, power, turn, sample.range_cm <= within_cm || bounded)
            }
            PrimitiveSpec::RunUntilLine { color, drive: command } => {
                if color.matches(sample.rgb) {
                    drive.stop();
                    MotionStatus::Done
                } else {
                    if let Some([power, turn]) = command {
                        drive.steer(power, turn);
                    }
                    MotionStatus::Running
                }
            }
            PrimitiveSpec::Hold { power, turn, ticks } => {
                if ticks == 0 {
                    MotionStatus::Done
                } else {
                    drive.steer(power, turn);
                    if self.ticks >= ticks {
                        MotionStatus::Done
                    } else {
                        MotionStatus::Running
                    }
                }
            }
        };

        if status == MotionStatus::Done {
            debug!(
                primitive = self.spec.name(),
                ticks = self.ticks,
                distance = drive.distance(),
                heading = drive.heading(),
                "primitive finished"
            );
        }
        status
    }
}

fn reached(value: f64, target: f64, increasing: bool) -> bool {
    if increasing { value >= target } else { value <= target }
}

/// Accelerate toward `power` until `reached`, then decelerate and finish once
/// the commanded power is exactly zero.
fn ramped_run(drive: &mut DriveController, power: i32, turn: i32, reached: bool) -> MotionStatus {
    if reached {
        drive.steer_ramped(0, turn, RAMP_RATE);
        if drive.command().power == 0 {
            return MotionStatus::Done;
        }
    } else {
        drive.steer_ramped(power, turn, RAMP_RATE);
    }
    MotionStatus::Running
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::DriveConfig;
    use crate::sample::Rgb;
    use std::f64::consts::PI;
    use tracer_kinematics::{CourseOrientation, EncoderSample, WheelCommand};

    const EPSILON: f64 = 1e-9;

    /// A drive where one encoder tick is exactly one unit of distance.
    fn drive() -> DriveController {
        DriveController::new(&DriveConfig {
            wheel_diameter: 360.0 / PI,
            ..DriveConfig::default()
        })
        .unwrap()
    }

    /// Synthetic tick source moving both wheels by `step` ticks per tick.
    struct Track {
        left: i32,
        right: i32,
    }

    impl Track {
        fn new() -> Self {
            Track { left: 0, right: 0 }
        }

        fn next(&mut self, left: i32, right: i32) -> SensorSample {
            self.left += left;
            self.right += right;
            SensorSample {
                encoders: EncoderSample::new(self.left, self.right),
                range_cm: 255,
                ..Default::default()
            }
        }
    }

    #[test]
    fn test_run_distance_stops_on_tenth_tick() {
        let mut drive = drive();
        let mut track = Track::new();
        drive.init(EncoderSample::default());
        let mut run = Primitive::start(
            PrimitiveSpec::RunDistance {
                power: 50,
                turn: 0,
                distance: 100.0,
            },
            &drive,
        )
        .unwrap();

        let mut ticks = 0;
        loop {
            ticks += 1;
            let sample = track.next(10, 10);
            drive.begin_tick(&sample);
            if run.poll(&mut drive, &sample) == MotionStatus::Done {
                break;
            }
            assert!(ticks < 10, "still running after tick {ticks}");
        }
        assert_eq!(ticks, 10);
        assert_eq!(drive.command().power, 0);
        assert_eq!(drive.take_output(), Some(WheelCommand::BRAKE));
    }

    #[test]
    fn test_run_distance_waits_for_full_stop() {
        let mut drive = drive();
        let mut track = Track::new();
        drive.init(EncoderSample::default());
        drive.steer(3, 0);
        let mut run = Primitive::start(
            PrimitiveSpec::RunDistance {
                power: 50,
                turn: 0,
                distance: 10.0,
            },
            &drive,
        )
        .unwrap();

        // Target reached on the first tick, but power has to ramp 3 -> 0.
        let mut ticks = 0;
        loop {
            ticks += 1;
            let sample = track.next(10, 10);
            drive.begin_tick(&sample);
            if run.poll(&mut drive, &sample) == MotionStatus::Done {
                break;
            }
        }
        assert!(ticks > 1);
        assert_eq!(drive.command().power, 0);
    }

    #[test]
    fn test_run_distance_backward() {
        let mut drive = drive();
        let mut track = Track::new();
        drive.init(EncoderSample::default());
        let mut run = Primitive::start(
            PrimitiveSpec::RunDistance {
                power: -50,
                turn: 0,
                distance: -30.0,
            },
            &drive,
        )
        .unwrap();
        let mut ticks = 0;
        loop {
            ticks += 1;
            let sample = track.next(-10, -10);
            drive.begin_tick(&sample);
            if run.poll(&mut drive, &sample) == MotionStatus::Done {
                break;
            }
        }
        assert_eq!(ticks, 3);
    }

    #[test]
    fn test_contract_violation_issues_nothing() {
        let mut drive = drive();
        drive.init(EncoderSample::default());
        let result = Primitive::start(
            PrimitiveSpec::RunDistance {
                power: 50,
                turn: 0,
                distance: -100.0,
            },
            &drive,
        );
        assert!(matches!(
            result,
            Err(MotionError::ContractViolation {
                primitive: "run_distance",
                ..
            })
        ));
        assert_eq!(drive.take_output(), None);
        assert!(drive.command().is_stop());
    }

    #[test]
    fn test_validate_sign_combinations() {
        let heading = |power, turn, heading| PrimitiveSpec::RunHeading { power, turn, heading };
        assert!(heading(20, 200, 30.0).validate().is_ok());
        assert!(heading(20, -200, -30.0).validate().is_ok());
        assert!(heading(20, 200, -30.0).validate().is_err());
        assert!(heading(0, 200, 30.0).validate().is_err());

        let obstacle = |power, max_distance| PrimitiveSpec::RunUntilObstacle {
            power,
            turn: 0,
            within_cm: 6,
            max_distance,
        };
        assert!(obstacle(10, 0.0).validate().is_ok());
        assert!(obstacle(10, 300.0).validate().is_ok());
        assert!(obstacle(-10, 0.0).validate().is_err());
        assert!(obstacle(10, -1.0).validate().is_err());
    }

    #[test]
    fn test_run_heading_right_turn() {
        let mut drive = drive();
        let mut track = Track::new();
        drive.init(EncoderSample::default());
        let mut run = Primitive::start(
            PrimitiveSpec::RunHeading {
                power: 20,
                turn: 200,
                heading: 30.0,
            },
            &drive,
        )
        .unwrap();
        let mut done = false;
        for _ in 0..1000 {
            let sample = track.next(5, -5);
            drive.begin_tick(&sample);
            if run.poll(&mut drive, &sample) == MotionStatus::Done {
                done = true;
                break;
            }
        }
        assert!(done);
        assert!(drive.heading() >= 30.0);
        assert_eq!(drive.command().power, 0);
    }

    #[test]
    fn test_run_heading_mirrors_on_right_course() {
        let mut drive = DriveController::new(&DriveConfig {
            wheel_diameter: 360.0 / PI,
            orientation: CourseOrientation::Right,
            ..DriveConfig::default()
        })
        .unwrap();
        let mut track = Track::new();
        drive.init(EncoderSample::default());
        let mut run = Primitive::start(
            PrimitiveSpec::RunHeading {
                power: 20,
                turn: 200,
                heading: 30.0,
            },
            &drive,
        )
        .unwrap();
        let mut done = false;
        for _ in 0..1000 {
            // The mirrored spin turns left, so the right wheel leads.
            let sample = track.next(-5, 5);
            drive.begin_tick(&sample);
            let status = run.poll(&mut drive, &sample);
            assert_eq!(drive.command().turn, -200);
            assert!(drive.heading() < 0.0);
            if status == MotionStatus::Done {
                done = true;
                break;
            }
        }
        assert!(done);
        assert!(drive.heading() <= -30.0);
        assert!(drive.heading() > -30.0 - 4.0);
        assert_eq!(drive.command().power, 0);
    }

    #[test]
    fn test_start_captures_reference_before_next_tick() {
        let mut drive = drive();
        let mut track = Track::new();
        drive.init(EncoderSample::default());
        let sample = track.next(25, 25);
        drive.begin_tick(&sample);

        let mut run = Primitive::start(
            PrimitiveSpec::RunDistanceDirect {
                power: 20,
                turn: 0,
                distance: 10.0,
            },
            &drive,
        )
        .unwrap();
        assert!((run.reference() - 25.0).abs() < EPSILON);

        let sample = track.next(10, 10);
        drive.begin_tick(&sample);
        assert_eq!(run.poll(&mut drive, &sample), MotionStatus::Done);
    }

    #[test]
    fn test_run_until_obstacle() {
        let mut drive = drive();
        let mut track = Track::new();
        drive.init(EncoderSample::default());
        let mut run = Primitive::start(
            PrimitiveSpec::RunUntilObstacle {
                power: 10,
                turn: 0,
                within_cm: 6,
                max_distance: 0.0,
            },
            &drive,
        )
        .unwrap();
        for _ in 0..5 {
            let sample = track.next(1, 1);
            drive.begin_tick(&sample);
            assert_eq!(run.poll(&mut drive, &sample), MotionStatus::Running);
        }
        let mut sample = track.next(1, 1);
        sample.range_cm = 6;
        drive.begin_tick(&sample);
        assert_eq!(run.poll(&mut drive, &sample), MotionStatus::Done);
    }

    #[test]
    fn test_run_until_obstacle_distance_bound() {
        let mut drive = drive();
        let mut track = Track::new();
        drive.init(EncoderSample::default());
        let mut run = Primitive::start(
            PrimitiveSpec::RunUntilObstacle {
                power: 10,
                turn: 0,
                within_cm: 6,
                max_distance: 40.0,
            },
            &drive,
        )
        .unwrap();
        let mut ticks = 0;
        loop {
            ticks += 1;
            let sample = track.next(10, 10);
            drive.begin_tick(&sample);
            if run.poll(&mut drive, &sample) == MotionStatus::Done {
                break;
            }
        }
        assert_eq!(ticks, 4);
    }

    #[test]
    fn test_run_until_line_is_a_hard_stop() {
        let mut drive = drive();
        let mut track = Track::new();
        drive.init(EncoderSample::default());
        let mut run = Primitive::start(
            PrimitiveSpec::RunUntilLine {
                color: ColorThreshold::BLACK,
                drive: Some([20, -60]),
            },
            &drive,
        )
        .unwrap();
        let mut sample = track.next(3, 3);
        sample.rgb = Rgb::new(160, 170, 170);
        drive.begin_tick(&sample);
        assert_eq!(run.poll(&mut drive, &sample), MotionStatus::Running);
        assert_eq!(drive.command().power, 20);

        sample.rgb = Rgb::new(20, 30, 30);
        drive.begin_tick(&sample);
        assert_eq!(run.poll(&mut drive, &sample), MotionStatus::Done);
        assert_eq!(drive.take_output(), Some(WheelCommand::BRAKE));
    }

    #[test]
    fn test_run_distance_direct_does_not_ramp() {
        let mut drive = drive();
        let mut track = Track::new();
        drive.init(EncoderSample::default());
        let mut run = Primitive::start(
            PrimitiveSpec::RunDistanceDirect {
                power: 20,
                turn: 85,
                distance: 20.0,
            },
            &drive,
        )
        .unwrap();
        let sample = track.next(10, 10);
        drive.begin_tick(&sample);
        assert_eq!(run.poll(&mut drive, &sample), MotionStatus::Running);
        assert_eq!(drive.command().power, 20);
        let sample = track.next(10, 10);
        drive.begin_tick(&sample);
        assert_eq!(run.poll(&mut drive, &sample), MotionStatus::Done);
        assert_eq!(drive.command().power, 20);
    }

    #[test]
    fn test_hold() {
        let mut drive = drive();
        let sample = SensorSample::default();
        let mut hold = Primitive::start(
            PrimitiveSpec::Hold {
                power: 0,
                turn: 0,
                ticks: 3,
            },
            &drive,
        )
        .unwrap();
        assert_eq!(hold.poll(&mut drive, &sample), MotionStatus::Running);
        assert_eq!(hold.poll(&mut drive, &sample), MotionStatus::Running);
        assert_eq!(hold.poll(&mut drive, &sample), MotionStatus::Done);
    }
}
