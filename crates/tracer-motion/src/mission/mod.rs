//! Declarative mission tables.
//!
//! A mission is a list of phases. Each phase runs one [`Action`] per tick and
//! leaves through the first of its [`Transition`]s whose [`Guard`] holds.
//! Tables are plain data and are deserialized from the files under
//! `config/missions/`.

mod guard;
mod sequencer;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::MissionError;
use crate::gate::StraightnessSettings;
use crate::primitive::PrimitiveSpec;

pub use guard::{Guard, GuardContext, Marks};
pub use sequencer::{Sequencer, SequencerStatus};

/// A complete mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionTable {
    /// Name used in logs and telemetry.
    pub name: String,
    /// Phase the mission starts in.
    pub initial: String,
    /// Settings of the straightness detector used by the `straight` guard.
    #[serde(default)]
    pub straightness: StraightnessSettings,
    /// All phases, in any order.
    pub phases: Vec<PhaseSpec>,
}

/// One segment of a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSpec {
    /// Unique phase name.
    pub name: String,
    /// What to do every tick while in this phase.
    #[serde(default)]
    pub action: Action,
    /// Exits, checked in order after the action has run.
    #[serde(default)]
    pub transitions: Vec<Transition>,
    /// Reaching this phase ends the mission with a full stop.
    #[serde(default)]
    pub terminal: bool,
    /// Keep the distance, heading and gyro marks of the previous phase instead
    /// of taking new ones on entry.
    #[serde(default)]
    pub keep_mark: bool,
}

/// An exit from a phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Target phase.
    pub to: String,
    /// Condition for leaving.
    pub when: Guard,
    /// Fire at most once per mission run.
    #[serde(default)]
    pub once: bool,
}

/// Reduce the line-trace power while the correction is large.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowDown {
    /// Slow down once `|turn|` reaches this value.
    pub turn: i16,
    /// Power used while slowed down.
    pub power: i32,
}

/// Per-tick behavior of a phase.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Issue nothing; the actuators keep the last command.
    #[default]
    Idle,
    /// Steer directly.
    Steer {
        /// Power.
        power: i32,
        /// Turn.
        turn: i32,
    },
    /// Ramp power toward `power`.
    SteerRamped {
        /// Target power.
        power: i32,
        /// Turn.
        turn: i32,
        /// Power change per tick.
        rate: f32,
    },
    /// Ramp the turn toward `turn`, optionally ramping power as well.
    RampTurn {
        /// Target turn.
        turn: i16,
        /// Turn change per tick.
        turn_rate: f32,
        /// Power.
        power: i32,
        /// Power change per tick, steer directly when absent.
        #[serde(default)]
        power_rate: Option<f32>,
    },
    /// Follow the line edge with this phase's PID controller.
    LineTrace {
        /// Red channel value the controller holds.
        target: f64,
        /// Power.
        power: i32,
        /// Power change per tick, steer directly when absent.
        #[serde(default)]
        rate: Option<f32>,
        /// Trace the other edge of the line.
        #[serde(default)]
        invert: bool,
        /// Lower power in sharp corrections.
        #[serde(default)]
        slow: Option<SlowDown>,
    },
    /// Brake.
    Stop,
    /// Run motion primitives one after another, then report done.
    Sequence {
        /// Primitives to run.
        steps: Vec<PrimitiveSpec>,
    },
    /// Vote on whether an obstacle is in front, then report done.
    Classify {
        /// Number of samples.
        window: u32,
        /// Required share of hits in percent.
        percent: u32,
        /// A sample is a hit when the rangefinder reads at most this.
        within_cm: i16,
    },
}

impl MissionTable {
    /// Check phase names, transition targets and gate settings.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), MissionError> {
        if self.phases.is_empty() {
            return Err(MissionError::Empty(self.name.clone()));
        }
        if self.straightness.window == 0 {
            return Err(MissionError::InvalidGate {
                phase: self.name.clone(),
                reason: "straightness window must not be empty",
            });
        }

        let mut names = HashSet::new();
        for phase in &self.phases {
            if !names.insert(phase.name.as_str()) {
                return Err(MissionError::DuplicatePhase(phase.name.clone()));
            }
        }
        if !names.contains(self.initial.as_str()) {
            return Err(MissionError::UnknownPhase(self.initial.clone()));
        }

        for phase in &self.phases {
            if let Some(t) = phase.transitions.iter().find(|t| !names.contains(t.to.as_str())) {
                return Err(MissionError::UnknownPhase(t.to.clone()));
            }
            if let Action::Classify { window, percent, .. } = phase.action {
                if window == 0 {
                    return Err(MissionError::InvalidGate {
                        phase: phase.name.clone(),
                        reason: "classification window must not be empty",
                    });
                }
                if percent > 100 {
                    return Err(MissionError::InvalidGate {
                        phase: phase.name.clone(),
                        reason: "required share exceeds 100 percent",
                    });
                }
            }
        }
        Ok(())
    }

    /// Index of the phase called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.phases.iter().position(|p| p.name == name)
    }
}
