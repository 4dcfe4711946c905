use anyhow::Context;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::{error, info};

use tracer_kinematics::{CourseOrientation, PidGains};
use tracer_motion::{DriveConfig, MissionTable};

use crate::sim::SimSettings;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const LOCAL_CONFIG_PATH: &str = "config/local.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub control: ControlSettings,
    pub robot: RobotSettings,
    pub pid: PidProfiles,
    pub sim: SimSettings,
    pub telemetry: TelemetrySettings,
    pub visualization: VisualizationSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlSettings {
    /// Control period in milliseconds.
    pub tick_ms: u64,
    pub course: CourseOrientation,
    pub pid_profile: PidProfile,
    /// Path of the mission table to run.
    pub mission: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PidProfile {
    Physical,
    Simulator,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RobotSettings {
    pub wheel_diameter: f64,
    pub tread: f64,
    pub degrees_per_tick: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PidProfiles {
    pub physical: PidGains,
    pub simulator: PidGains,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TelemetrySettings {
    pub interval_ms: u64,
    pub topic_capacity: usize,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VisualizationSettings {
    pub enabled: bool,
    /// Pixels per millimeter.
    pub scale: f32,
}

impl Settings {
    /// Gains of the selected PID profile.
    pub fn gains(&self) -> PidGains {
        match self.control.pid_profile {
            PidProfile::Physical => self.pid.physical,
            PidProfile::Simulator => self.pid.simulator,
        }
    }

    pub fn drive_config(&self) -> DriveConfig {
        DriveConfig {
            wheel_diameter: self.robot.wheel_diameter,
            tread: self.robot.tread,
            degrees_per_tick: self.robot.degrees_per_tick,
            tick_period: self.control.tick_ms as f64 / 1000.0,
            orientation: self.control.course,
            gains: self.gains(),
        }
    }
}

/// Load `config/default.toml`, overridden by `config/local.toml` and
/// `TRACER__SECTION__KEY` environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true))
        .add_source(File::new(LOCAL_CONFIG_PATH, FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix("TRACER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|config| config.try_deserialize::<Settings>());

    match settings {
        Ok(settings) => {
            info!(
                mission = %settings.control.mission,
                course = ?settings.control.course,
                profile = ?settings.control.pid_profile,
                "Successfully loaded configuration"
            );
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e).context("loading configuration")
        }
    }
}

/// Load and validate a mission table file.
pub fn load_mission(path: &str) -> anyhow::Result<MissionTable> {
    info!("Loading mission table from {}", path);
    let config = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(true))
        .build()
        .with_context(|| format!("reading mission table {path}"))?;
    parse_mission(config).with_context(|| format!("in mission table {path}"))
}

fn parse_mission(config: Config) -> anyhow::Result<MissionTable> {
    let table: MissionTable = config.try_deserialize()?;
    table.validate()?;
    Ok(table)
}
