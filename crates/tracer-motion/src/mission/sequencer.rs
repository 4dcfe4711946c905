use tracer_kinematics::PidController;
use tracing::{debug, info};

use super::guard::{GuardContext, Marks};
use super::{Action, MissionTable};
use crate::drive::DriveController;
use crate::error::MissionError;
use crate::gate::{MajorityVote, StraightnessDetector};
use crate::primitive::{MotionStatus, Primitive, PrimitiveSpec};
use crate::sample::SensorSample;

/// Result of one sequencer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerStatus {
    /// The mission is still running.
    Running,
    /// A terminal phase was reached and the robot is braked.
    Complete,
}

/// Progress of the current phase's action.
#[derive(Debug, Clone, Default)]
struct Progress {
    step: usize,
    primitive: Option<Primitive>,
    vote: Option<MajorityVote>,
    done: bool,
}

/// Runs a [`MissionTable`] one tick at a time.
#[derive(Debug, Clone)]
pub struct Sequencer {
    table: MissionTable,
    current: usize,
    fired: Vec<Vec<bool>>,
    marks: Marks,
    pid: PidController,
    progress: Progress,
    straightness: StraightnessDetector,
    pattern: Option<bool>,
    ticks_in_phase: u64,
}

impl Sequencer {
    /// Validate `table` and prepare to run it from its initial phase.
    ///
    /// # Errors
    ///
    /// Returns the validation error of an inconsistent table.
    pub fn new(table: MissionTable, drive: &DriveController) -> Result<Self, MissionError> {
        table.validate()?;
        let current = table
            .position(&table.initial)
            .ok_or_else(|| MissionError::UnknownPhase(table.initial.clone()))?;
        let fired = table.phases.iter().map(|p| vec![false; p.transitions.len()]).collect();
        let straightness = StraightnessDetector::new(table.straightness);
        info!(mission = %table.name, phase = %table.initial, "mission loaded");
        let mut progress = Progress::default();
        start_action(&table.phases[current].action, &mut progress, drive);
        Ok(Sequencer {
            current,
            fired,
            marks: Marks {
                distance: drive.distance(),
                heading: drive.heading(),
                gyro: 0,
            },
            pid: drive.pid(),
            progress,
            straightness,
            pattern: None,
            ticks_in_phase: 0,
            table,
        })
    }

    /// Name of the mission.
    pub fn mission(&self) -> &str {
        &self.table.name
    }

    /// Name of the current phase.
    pub fn phase(&self) -> &str {
        &self.table.phases[self.current].name
    }

    /// Ticks spent in the current phase.
    pub fn ticks_in_phase(&self) -> u64 {
        self.ticks_in_phase
    }

    /// Last classification result.
    pub fn pattern(&self) -> Option<bool> {
        self.pattern
    }

    /// Run one tick: the current phase's action, then its transitions.
    ///
    /// Call after [`DriveController::begin_tick`]; the wheel command, if any,
    /// is left in the drive controller.
    pub fn step(&mut self, drive: &mut DriveController, sample: &SensorSample) -> SequencerStatus {
        if self.table.phases[self.current].terminal {
            drive.stop();
            return SequencerStatus::Complete;
        }
        self.ticks_in_phase += 1;

        let traced = run_action(
            &self.table.phases[self.current].action,
            &mut self.progress,
            &mut self.pid,
            &mut self.pattern,
            drive,
            sample,
        );
        let turn = traced.unwrap_or_else(|| drive.mapper().mirror(i32::from(drive.command().turn)) as i16);
        self.straightness.feed(turn);

        let ctx = GuardContext {
            drive: &*drive,
            sample,
            marks: self.marks,
            done: self.progress.done,
            pattern: self.pattern,
            straight: self.straightness.is_straight(),
        };
        let phase = &self.table.phases[self.current];
        let mut next = None;
        for (i, transition) in phase.transitions.iter().enumerate() {
            if transition.once && self.fired[self.current][i] {
                continue;
            }
            if transition.when.holds(&ctx) {
                if transition.once {
                    self.fired[self.current][i] = true;
                }
                next = self.table.position(&transition.to);
                break;
            }
        }

        match next {
            Some(index) => self.enter(index, drive, sample),
            None => SequencerStatus::Running,
        }
    }

    fn enter(&mut self, index: usize, drive: &mut DriveController, sample: &SensorSample) -> SequencerStatus {
        let from = self.current;
        self.current = index;
        let phase = &self.table.phases[index];
        if !phase.keep_mark {
            self.marks = Marks::take(drive, sample);
        }
        self.pid = drive.pid();
        self.progress = Progress::default();
        self.straightness.reset();
        info!(
            mission = %self.table.name,
            from = %self.table.phases[from].name,
            phase = %phase.name,
            ticks = self.ticks_in_phase,
            distance = drive.distance(),
            heading = drive.heading(),
            "phase transition"
        );
        self.ticks_in_phase = 0;
        start_action(&phase.action, &mut self.progress, drive);

        if phase.terminal {
            drive.stop();
            info!(mission = %self.table.name, "mission complete");
            SequencerStatus::Complete
        } else {
            SequencerStatus::Running
        }
    }
}

/// Prepare `action` at phase entry, between ticks.
fn start_action(action: &Action, progress: &mut Progress, drive: &DriveController) {
    if let Action::Sequence { steps } = action {
        start_step(steps, progress, drive);
    }
}

/// Start the primitive at `progress.step` from the drive state as it is now.
/// Rejected primitives are skipped; running off the end finishes the sequence.
fn start_step(steps: &[PrimitiveSpec], progress: &mut Progress, drive: &DriveController) {
    progress.primitive = None;
    while let Some(spec) = steps.get(progress.step) {
        match Primitive::start(spec.clone(), drive) {
            Ok(primitive) => {
                progress.primitive = Some(primitive);
                return;
            }
            // Already logged.
            Err(_) => progress.step += 1,
        }
    }
    progress.done = true;
}

/// Run one tick of `action`. Returns the turn computed by the action before
/// course mirroring, for actions that compute one.
fn run_action(
    action: &Action,
    progress: &mut Progress,
    pid: &mut PidController,
    pattern: &mut Option<bool>,
    drive: &mut DriveController,
    sample: &SensorSample,
) -> Option<i16> {
    match action {
        Action::Idle => None,
        Action::Steer { power, turn } => {
            drive.steer(*power, *turn);
            None
        }
        Action::SteerRamped { power, turn, rate } => {
            drive.steer_ramped(*power, *turn, *rate);
            None
        }
        Action::RampTurn {
            turn,
            turn_rate,
            power,
            power_rate,
        } => {
            let turn = drive.ramp_turn(*turn, *turn_rate);
            match power_rate {
                Some(rate) => drive.steer_ramped(*power, i32::from(turn), *rate),
                None => drive.steer(*power, i32::from(turn)),
            };
            Some(turn)
        }
        Action::LineTrace {
            target,
            power,
            rate,
            invert,
            slow,
        } => {
            let turn = pid.update(f64::from(sample.rgb.r), *target);
            let power = match slow {
                Some(slow) if turn.abs() >= slow.turn => slow.power,
                _ => *power,
            };
            let steer_turn = if *invert { -i32::from(turn) } else { i32::from(turn) };
            match rate {
                Some(rate) => drive.steer_ramped(power, steer_turn, *rate),
                None => drive.steer(power, steer_turn),
            };
            Some(turn)
        }
        Action::Stop => {
            drive.stop();
            None
        }
        Action::Sequence { steps } => {
            while let Some(primitive) = progress.primitive.as_mut() {
                match primitive.poll(drive, sample) {
                    MotionStatus::Running => break,
                    MotionStatus::Done => {
                        progress.step += 1;
                        start_step(steps, progress, drive);
                    }
                }
            }
            None
        }
        Action::Classify {
            window,
            percent,
            within_cm,
        } => {
            if !progress.done {
                let vote = progress.vote.get_or_insert_with(|| MajorityVote::new(*window, *percent));
                if let Some(present) = vote.feed(sample.range_cm <= *within_cm) {
                    debug!(present, hits = vote.hits(), "classification decided");
                    progress.done = true;
                    *pattern = Some(present);
                }
            }
            None
        }
    }
}
