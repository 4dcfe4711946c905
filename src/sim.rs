//! Simulated differential-drive robot on a line course.
//!
//! Integrates wheel powers into a ground-truth pose and renders the sensors
//! the control loop expects: color under the sensor, rangefinder distance,
//! pitch from the gyro and raw encoder counts.

use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use tracer_kinematics::{EncoderSample, WheelCommand, WheelOutput};
use tracer_motion::{Rgb, SensorSample};

use crate::config::RobotSettings;
use crate::control_loop::Plant;

/// Rangefinder reading with nothing in sight.
pub const RANGE_MAX_CM: i16 = 255;

#[derive(Debug, Clone, Deserialize)]
pub struct SimSettings {
    /// Seed for sensor noise.
    pub seed: u64,
    /// Wheel speed at full power, in degrees per second.
    pub motor_speed: f64,
    /// Time constant of the wheel speed response in seconds, `0` for instant.
    #[serde(default)]
    pub motor_lag: f64,
    /// Distance of the color sensor ahead of the wheel axle.
    pub sensor_offset: f64,
    /// Uniform noise amplitude on each color channel.
    pub color_noise: u16,
    /// Uniform noise amplitude on the rangefinder.
    pub range_noise: i16,
    pub start: SimPose,
    pub floor: Rgb,
    pub line_color: Rgb,
    pub line_width: f64,
    /// Width of the blurred band on each side of the line.
    pub edge_width: f64,
    /// The line, as a polyline of `[x, y]` points.
    pub line: Vec<[f64; 2]>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub walls: Vec<Wall>,
    #[serde(default)]
    pub slopes: Vec<Slope>,
}

/// Position in millimeters, heading in degrees with right turns positive.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct SimPose {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
}

impl SimPose {
    /// Unit vector the robot is facing.
    pub fn direction(&self) -> (f64, f64) {
        let h = self.heading.to_radians();
        (h.cos(), -h.sin())
    }

    /// Point `offset` ahead of the robot.
    pub fn ahead(&self, offset: f64) -> [f64; 2] {
        let (dx, dy) = self.direction();
        [self.x + dx * offset, self.y + dy * offset]
    }
}

/// A colored disc on the floor.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Marker {
    pub center: [f64; 2],
    pub radius: f64,
    pub color: Rgb,
}

/// A wall segment seen by the rangefinder.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Wall {
    pub from: [f64; 2],
    pub to: [f64; 2],
}

/// A disc where the floor is pitched.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Slope {
    pub center: [f64; 2],
    pub radius: f64,
    pub pitch: i16,
}

pub struct SimPlant<R = StdRng> {
    settings: SimSettings,
    robot: RobotSettings,
    dt: f64,
    pose: SimPose,
    wheel_degrees: [f64; 2],
    /// Wheel speeds in degrees per second.
    wheel_speed: [f64; 2],
    command: WheelCommand,
    rng: R,
    abort: Arc<AtomicBool>,
}

impl SimPlant<StdRng> {
    pub fn new(settings: SimSettings, robot: RobotSettings, dt: f64, abort: Arc<AtomicBool>) -> Self {
        let rng = StdRng::seed_from_u64(settings.seed);
        SimPlant::with_rng(settings, robot, dt, abort, rng)
    }
}

impl<R: Rng> SimPlant<R> {
    pub fn with_rng(settings: SimSettings, robot: RobotSettings, dt: f64, abort: Arc<AtomicBool>, rng: R) -> Self {
        SimPlant {
            pose: settings.start,
            settings,
            robot,
            dt,
            wheel_degrees: [0.0; 2],
            wheel_speed: [0.0; 2],
            command: WheelCommand::BRAKE,
            rng,
            abort,
        }
    }

    pub fn pose(&self) -> SimPose {
        self.pose
    }

    /// Integrate one tick of motion under the current wheel command.
    fn advance(&mut self) {
        let full = self.settings.motor_speed;
        let response = if self.settings.motor_lag > 0.0 {
            (self.dt / self.settings.motor_lag).min(1.0)
        } else {
            1.0
        };
        for (speed, output) in self.wheel_speed.iter_mut().zip([self.command.left, self.command.right]) {
            *speed = match output {
                WheelOutput::Power(p) => *speed + (f64::from(p) / 100.0 * full - *speed) * response,
                WheelOutput::Brake => 0.0,
            };
        }
        let left = self.wheel_speed[0] * self.dt;
        let right = self.wheel_speed[1] * self.dt;
        self.wheel_degrees[0] += left;
        self.wheel_degrees[1] += right;

        let per_degree = PI * self.robot.wheel_diameter / 360.0;
        let (sl, sr) = (left * per_degree, right * per_degree);
        let turn = ((sl - sr) / self.robot.tread).to_degrees();

        let mid = SimPose {
            heading: self.pose.heading + turn / 2.0,
            ..self.pose
        };
        let (dx, dy) = mid.direction();
        let step = (sl + sr) / 2.0;
        self.pose.x += dx * step;
        self.pose.y += dy * step;
        self.pose.heading += turn;
    }

    fn encoders(&self) -> EncoderSample {
        let ticks = |degrees: f64| (degrees / self.robot.degrees_per_tick).round() as i32;
        EncoderSample::new(ticks(self.wheel_degrees[0]), ticks(self.wheel_degrees[1]))
    }

    /// Noise-free color under the sensor.
    pub fn floor_color(&self, point: [f64; 2]) -> Rgb {
        if let Some(marker) = self
            .settings
            .markers
            .iter()
            .find(|m| distance(point, m.center) <= m.radius)
        {
            return marker.color;
        }

        let d = self
            .settings
            .line
            .windows(2)
            .map(|seg| distance_to_segment(point, seg[0], seg[1]))
            .fold(f64::INFINITY, f64::min);
        let half = self.settings.line_width / 2.0;
        if d <= half {
            self.settings.line_color
        } else if d < half + self.settings.edge_width {
            blend(self.settings.line_color, self.settings.floor, (d - half) / self.settings.edge_width)
        } else {
            self.settings.floor
        }
    }

    /// Noise-free rangefinder distance in centimeters.
    pub fn range(&self) -> i16 {
        let origin = [self.pose.x, self.pose.y];
        let (dx, dy) = self.pose.direction();
        let nearest = self
            .settings
            .walls
            .iter()
            .filter_map(|w| ray_hit(origin, (dx, dy), w.from, w.to))
            .fold(f64::INFINITY, f64::min);
        if nearest.is_finite() {
            (nearest / 10.0).round().min(f64::from(RANGE_MAX_CM)) as i16
        } else {
            RANGE_MAX_CM
        }
    }

    fn pitch(&self) -> i16 {
        let at = [self.pose.x, self.pose.y];
        self.settings
            .slopes
            .iter()
            .find(|s| distance(at, s.center) <= s.radius)
            .map_or(0, |s| s.pitch)
    }

    fn noisy_color(&mut self, rgb: Rgb) -> Rgb {
        let n = i32::from(self.settings.color_noise);
        let mut channel = |v: u16| {
            let noise = if n > 0 { self.rng.random_range(-n..=n) } else { 0 };
            (i32::from(v) + noise).clamp(0, 255) as u16
        };
        Rgb::new(channel(rgb.r), channel(rgb.g), channel(rgb.b))
    }
}

impl<R: Rng> Plant for SimPlant<R> {
    fn sample(&mut self) -> SensorSample {
        self.advance();
        let rgb = self.floor_color(self.pose.ahead(self.settings.sensor_offset));
        let rgb = self.noisy_color(rgb);
        let range = self.range();
        let n = self.settings.range_noise;
        let range_cm = if n > 0 && range < RANGE_MAX_CM {
            (range + self.rng.random_range(-n..=n)).clamp(0, RANGE_MAX_CM)
        } else {
            range
        };
        SensorSample {
            rgb,
            range_cm,
            gyro_angle: self.pitch(),
            encoders: self.encoders(),
            wheel_power: [self.command.left.power(), self.command.right.power()],
            abort: self.abort.load(Ordering::Relaxed),
        }
    }

    fn apply(&mut self, command: WheelCommand) {
        self.command = command;
    }
}

fn distance(a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}

fn distance_to_segment(p: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    let (abx, aby) = (b[0] - a[0], b[1] - a[1]);
    let len2 = abx * abx + aby * aby;
    if len2 == 0.0 {
        return distance(p, a);
    }
    let t = (((p[0] - a[0]) * abx + (p[1] - a[1]) * aby) / len2).clamp(0.0, 1.0);
    distance(p, [a[0] + t * abx, a[1] + t * aby])
}

/// Distance along the ray to the segment, if it is hit in front of the origin.
fn ray_hit(origin: [f64; 2], (dx, dy): (f64, f64), a: [f64; 2], b: [f64; 2]) -> Option<f64> {
    let (ex, ey) = (b[0] - a[0], b[1] - a[1]);
    let denom = dx * ey - dy * ex;
    if denom.abs() < 1e-12 {
        return None;
    }
    let (wx, wy) = (a[0] - origin[0], a[1] - origin[1]);
    let t = (wx * ey - wy * ex) / denom;
    let u = (wx * dy - wy * dx) / denom;
    (t >= 0.0 && (0.0..=1.0).contains(&u)).then_some(t)
}

fn blend(from: Rgb, to: Rgb, t: f64) -> Rgb {
    let mix = |a: u16, b: u16| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u16;
    Rgb::new(mix(from.r, to.r), mix(from.g, to.g), mix(from.b, to.b))
}
