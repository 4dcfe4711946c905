use serde::{Deserialize, Serialize};

use crate::drive::DriveController;
use crate::sample::{ColorThreshold, SensorSample};

/// Odometry and gyro values captured when a phase is entered.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Marks {
    /// Distance at entry.
    pub distance: f64,
    /// Heading at entry.
    pub heading: f64,
    /// Gyro angle at entry.
    pub gyro: i16,
}

impl Marks {
    /// Take marks from the current state.
    pub fn take(drive: &DriveController, sample: &SensorSample) -> Self {
        Marks {
            distance: drive.distance(),
            heading: drive.heading(),
            gyro: sample.gyro_angle,
        }
    }
}

/// Everything a guard may look at.
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    /// Drive state after this tick's action.
    pub drive: &'a DriveController,
    /// This tick's sensor inputs.
    pub sample: &'a SensorSample,
    /// Marks of the current phase.
    pub marks: Marks,
    /// The phase action has finished.
    pub done: bool,
    /// Last classification result.
    pub pattern: Option<bool>,
    /// The straightness detector reports straight.
    pub straight: bool,
}

/// Condition for a phase transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Guard {
    /// Always true.
    Always,
    /// The phase action (sequence or classification) has finished.
    Done,
    /// Last commanded power is zero.
    Stopped,
    /// Last commanded `|turn|` is at most `limit`.
    TurnWithin {
        /// Largest accepted turn.
        limit: i16,
    },
    /// Cumulative distance is above `value`.
    DistanceAbove {
        /// Bound.
        value: f64,
    },
    /// Cumulative distance is below `value`.
    DistanceBelow {
        /// Bound.
        value: f64,
    },
    /// Cumulative heading is above `value` degrees.
    HeadingAbove {
        /// Bound.
        value: f64,
    },
    /// Cumulative heading is below `value` degrees.
    HeadingBelow {
        /// Bound.
        value: f64,
    },
    /// Distance covered since the mark, in either direction.
    TravelledAtLeast {
        /// Distance.
        distance: f64,
    },
    /// Heading changed by at least `degrees` since the mark, in either direction.
    TurnedAtLeast {
        /// Angle.
        degrees: f64,
    },
    /// The color sensor crosses a threshold.
    Color {
        /// Threshold.
        color: ColorThreshold,
    },
    /// The rangefinder reads at most `cm`.
    ObstacleWithin {
        /// Distance in centimeters.
        cm: i16,
    },
    /// The gyro has moved at least `degrees` away from its mark.
    Tilted {
        /// Angle.
        degrees: f64,
    },
    /// The last classification decided `present`.
    Pattern {
        /// Expected decision.
        present: bool,
    },
    /// The straightness detector reports straight.
    Straight,
    /// All of the guards hold.
    All {
        /// Guards.
        of: Vec<Guard>,
    },
    /// Any of the guards holds.
    Any {
        /// Guards.
        of: Vec<Guard>,
    },
    /// The guard does not hold.
    Not {
        /// Guard.
        guard: Box<Guard>,
    },
}

impl Guard {
    /// Evaluate against this tick's context.
    pub fn holds(&self, ctx: &GuardContext<'_>) -> bool {
        let drive = ctx.drive;
        match self {
            Guard::Always => true,
            Guard::Done => ctx.done,
            Guard::Stopped => drive.command().power == 0,
            Guard::TurnWithin { limit } => drive.command().turn.abs() <= *limit,
            Guard::DistanceAbove { value } => drive.distance() > *value,
            Guard::DistanceBelow { value } => drive.distance() < *value,
            Guard::HeadingAbove { value } => drive.heading() > *value,
            Guard::HeadingBelow { value } => drive.heading() < *value,
            Guard::TravelledAtLeast { distance } => (drive.distance() - ctx.marks.distance).abs() >= *distance,
            Guard::TurnedAtLeast { degrees } => (drive.heading() - ctx.marks.heading).abs() >= *degrees,
            Guard::Color { color } => color.matches(ctx.sample.rgb),
            Guard::ObstacleWithin { cm } => ctx.sample.range_cm <= *cm,
            Guard::Tilted { degrees } => {
                let tilt = f64::from(ctx.sample.gyro_angle) - f64::from(ctx.marks.gyro);
                tilt.abs() >= *degrees
            }
            Guard::Pattern { present } => ctx.pattern == Some(*present),
            Guard::Straight => ctx.straight,
            Guard::All { of } => of.iter().all(|g| g.holds(ctx)),
            Guard::Any { of } => of.iter().any(|g| g.holds(ctx)),
            Guard::Not { guard } => !guard.holds(ctx),
        }
    }
}
