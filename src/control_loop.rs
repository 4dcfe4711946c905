//! Fixed-period control loop.
//!
//! Every tick: sample the plant, check the abort input, integrate odometry,
//! step the mission and hand the resulting wheel command to the plant.

use std::time::{Duration, Instant};

use spin_sleep::SpinSleeper;
use tracing::{info, warn};

use tracer_kinematics::WheelCommand;
use tracer_motion::{DriveController, SensorSample, Sequencer, SequencerStatus};

use crate::blackboard::Telemetry;

/// Sensor and actuator seam of the robot.
pub trait Plant {
    /// Read all sensors for this tick.
    fn sample(&mut self) -> SensorSample;
    /// Send setpoints to both wheels.
    fn apply(&mut self, command: WheelCommand);
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The mission reached a terminal phase.
    Complete,
    /// The operator stop input was raised.
    Aborted,
}

pub struct ControlLoop<P> {
    plant: P,
    drive: DriveController,
    sequencer: Sequencer,
    tick: u64,
    started: Instant,
}

impl<P: Plant> ControlLoop<P> {
    /// Take a first sample and zero odometry on it.
    pub fn new(mut plant: P, mut drive: DriveController, sequencer: Sequencer) -> Self {
        let baseline = plant.sample();
        drive.init(baseline.encoders);
        ControlLoop {
            plant,
            drive,
            sequencer,
            tick: 0,
            started: Instant::now(),
        }
    }

    pub fn plant(&self) -> &P {
        &self.plant
    }

    pub fn drive(&self) -> &DriveController {
        &self.drive
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Run a single tick. Returns why the loop should stop, if it should.
    pub fn tick(&mut self) -> (Option<LoopExit>, Telemetry) {
        let sample = self.plant.sample();
        self.tick += 1;

        let exit = if sample.abort {
            self.drive.stop();
            Some(LoopExit::Aborted)
        } else {
            self.drive.begin_tick(&sample);
            match self.sequencer.step(&mut self.drive, &sample) {
                SequencerStatus::Running => None,
                SequencerStatus::Complete => Some(LoopExit::Complete),
            }
        };
        if let Some(command) = self.drive.take_output() {
            self.plant.apply(command);
        }
        (exit, self.telemetry(&sample))
    }

    fn telemetry(&self, sample: &SensorSample) -> Telemetry {
        Telemetry {
            tick: self.tick,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            rgb: sample.rgb,
            range_cm: sample.range_cm,
            gyro_angle: sample.gyro_angle,
            distance: self.drive.distance(),
            heading: self.drive.heading(),
            speed: self.drive.odometry().speed(),
            command: self.drive.command(),
            reported: sample.reported_command(),
            mission: self.sequencer.mission().to_string(),
            phase: self.sequencer.phase().to_string(),
        }
    }

    /// Tick every `period` until the mission completes or is aborted.
    ///
    /// `observe` sees the loop after every tick, with its telemetry.
    pub fn run<F>(&mut self, period: Duration, mut observe: F) -> LoopExit
    where
        F: FnMut(&Self, &Telemetry),
    {
        info!(period = ?period, mission = %self.sequencer.mission(), "Control loop started.");
        let sleeper = SpinSleeper::new(1_000);
        let mut next = Instant::now();
        loop {
            let (exit, telemetry) = self.tick();
            observe(self, &telemetry);
            if let Some(exit) = exit {
                info!(?exit, ticks = self.tick, distance = self.drive.distance(), "Control loop finished.");
                return exit;
            }

            next += period;
            let now = Instant::now();
            match next.checked_duration_since(now) {
                Some(wait) => sleeper.sleep(wait),
                None => {
                    if !period.is_zero() {
                        warn!(tick = self.tick, behind = ?(now - next), "Control tick overran its period.");
                    }
                    next = now;
                }
            }
        }
    }
}
