//! Drive controller: the per-tick context shared by primitives and the sequencer.
//!
//! Owns the odometry, the two ramp channels and the steering mapper, and keeps
//! track of the command most recently handed to the actuators.

use serde::{Deserialize, Serialize};
use tracer_kinematics::{
    CourseOrientation, DriveState, EncoderSample, KinematicsError, MotionCommand, Odometry,
    PidController, PidGains, Ramp, SteeringMapper, WheelCommand,
};

use crate::sample::SensorSample;

/// Physical and control parameters of the drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Wheel diameter in millimeters.
    pub wheel_diameter: f64,
    /// Tread width in millimeters.
    pub tread: f64,
    /// Wheel degrees per encoder tick.
    pub degrees_per_tick: f64,
    /// Control loop period in seconds.
    pub tick_period: f64,
    /// Course side.
    pub orientation: CourseOrientation,
    /// Gains for line-trace PID controllers.
    pub gains: PidGains,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            wheel_diameter: 100.0,
            tread: 145.0,
            degrees_per_tick: 1.0,
            tick_period: 0.004,
            orientation: CourseOrientation::Left,
            gains: PidGains::new(1.38, 0.0, 0.15),
        }
    }
}

/// Context for one control loop.
#[derive(Debug, Clone)]
pub struct DriveController {
    odometry: Odometry,
    mapper: SteeringMapper,
    power_ramp: Ramp,
    turn_ramp: Ramp,
    pid_template: PidController,
    command: MotionCommand,
    output: Option<WheelCommand>,
}

impl DriveController {
    /// Build a controller from its configuration.
    ///
    /// # Errors
    ///
    /// Fails if the odometry parameters or the tick period are not positive.
    pub fn new(config: &DriveConfig) -> Result<Self, KinematicsError> {
        Ok(DriveController {
            odometry: Odometry::new(config.wheel_diameter, config.tread, config.degrees_per_tick)?,
            mapper: SteeringMapper::new(config.orientation),
            power_ramp: Ramp::new(),
            turn_ramp: Ramp::new(),
            pid_template: PidController::new(config.gains, config.tick_period)?,
            command: MotionCommand::STOP,
            output: None,
        })
    }

    /// Restart distance and heading measurement from `baseline`.
    pub fn init(&mut self, baseline: EncoderSample) {
        self.odometry.init(baseline);
    }

    /// Start a tick: integrate the encoders and forget last tick's output.
    pub fn begin_tick(&mut self, sample: &SensorSample) -> DriveState {
        self.output = None;
        self.odometry.update(sample.encoders)
    }

    /// Command `(power, turn)` directly, bypassing the ramps.
    pub fn steer(&mut self, power: i32, turn: i32) -> WheelCommand {
        let (command, wheels) = self.mapper.steer(power, turn);
        self.command = command;
        self.output = Some(wheels);
        wheels
    }

    /// Ramp power toward `power` by `change_rate` and steer with `turn`.
    pub fn steer_ramped(&mut self, power: i32, turn: i32, change_rate: f32) -> WheelCommand {
        let target = power.clamp(-100, 100) as i16;
        let shaped = self.power_ramp.step(target, change_rate, i16::from(self.command.power));
        self.steer(i32::from(shaped), turn)
    }

    /// Ramp the turn value toward `target` and return it without steering.
    ///
    /// The ramp compares against the last commanded turn before course
    /// mirroring, so it works the same on both course sides.
    pub fn ramp_turn(&mut self, target: i16, change_rate: f32) -> i16 {
        let actual = self.mapper.mirror(i32::from(self.command.turn)) as i16;
        self.turn_ramp.step(target, change_rate, actual)
    }

    /// Brake both wheels.
    pub fn stop(&mut self) -> WheelCommand {
        self.steer(0, 0)
    }

    /// The wheel command issued during the current tick, if any.
    pub fn take_output(&mut self) -> Option<WheelCommand> {
        self.output.take()
    }

    /// A fresh PID controller with the configured gains and period.
    pub fn pid(&self) -> PidController {
        let mut pid = self.pid_template.clone();
        pid.reset();
        pid
    }

    /// Last command handed to the steering mapper, after clamping and mirroring.
    pub fn command(&self) -> MotionCommand {
        self.command
    }

    /// Cumulative distance.
    pub fn distance(&self) -> f64 {
        self.odometry.distance()
    }

    /// Cumulative heading in degrees.
    pub fn heading(&self) -> f64 {
        self.odometry.heading()
    }

    /// Read-only access to the odometry.
    pub fn odometry(&self) -> &Odometry {
        &self.odometry
    }

    /// The steering mapper, for course mirroring.
    pub fn mapper(&self) -> &SteeringMapper {
        &self.mapper
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracer_kinematics::WheelOutput;

    fn controller(orientation: CourseOrientation) -> DriveController {
        DriveController::new(&DriveConfig {
            orientation,
            ..DriveConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config() {
        let config = DriveConfig {
            tick_period: 0.0,
            ..DriveConfig::default()
        };
        assert!(matches!(
            DriveController::new(&config),
            Err(KinematicsError::InvalidSamplePeriod(_))
        ));
        let config = DriveConfig {
            tread: 0.0,
            ..DriveConfig::default()
        };
        assert!(DriveController::new(&config).is_err());
    }

    #[test]
    fn test_steer_records_command_and_output() {
        let mut drive = controller(CourseOrientation::Left);
        drive.steer(50, 50);
        assert_eq!(drive.command(), MotionCommand { power: 50, turn: 50 });
        assert_eq!(drive.take_output(), Some(WheelCommand::powers(50, 25)));
        assert_eq!(drive.take_output(), None);
    }

    #[test]
    fn test_begin_tick_clears_output() {
        let mut drive = controller(CourseOrientation::Left);
        drive.steer(30, 0);
        drive.begin_tick(&SensorSample::default());
        assert_eq!(drive.take_output(), None);
        assert_eq!(drive.command().power, 30);
    }

    #[test]
    fn test_steer_ramped_accelerates() {
        let mut drive = controller(CourseOrientation::Left);
        for _ in 0..10 {
            drive.steer_ramped(100, 0, 0.5);
        }
        assert_eq!(drive.command().power, 5);
    }

    #[test]
    fn test_steer_ramped_resyncs_after_direct_steer() {
        let mut drive = controller(CourseOrientation::Left);
        drive.steer(40, 0);
        drive.steer_ramped(0, 0, 1.0);
        assert_eq!(drive.command().power, 39);
    }

    #[test]
    fn test_ramp_turn_on_right_course() {
        let mut drive = controller(CourseOrientation::Right);
        let mut turn = 0;
        for _ in 0..4 {
            turn = drive.ramp_turn(73, 0.5);
            drive.steer(60, i32::from(turn));
        }
        assert_eq!(turn, 2);
        assert_eq!(drive.command().turn, -2);
    }

    #[test]
    fn test_stop_brakes() {
        let mut drive = controller(CourseOrientation::Left);
        drive.steer(30, 10);
        let out = drive.stop();
        assert_eq!(out.left, WheelOutput::Brake);
        assert!(drive.command().is_stop());
    }

    #[test]
    fn test_pid_instances_are_fresh() {
        let drive = controller(CourseOrientation::Left);
        let mut a = drive.pid();
        a.update(90.0, 74.0);
        let b = drive.pid();
        assert_eq!(b.errors(), (0.0, 0.0));
        assert_eq!(b.dt(), 0.004);
    }
}
