mod blackboard; // telemetry snapshot shared with the visualization
mod bus; // broadcast topics between the control thread and async tasks
mod config;
mod control_loop;
mod graphics;
mod sim;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

use tracer_motion::{DriveController, MissionTable, Sequencer};

use blackboard::{Blackboard, Telemetry, publish, raise_fault, set_running};
use bus::{Subscription, Topic};
use config::Settings;
use control_loop::{ControlLoop, LoopExit};
use sim::SimPlant;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Tracer started. Loading configuration and mission...");
    let settings = config::load_settings()?;
    let mission = config::load_mission(&settings.control.mission)?;

    let bb: Blackboard = Arc::default();
    let telemetry_topic: Topic<Telemetry> = Topic::new("telemetry", settings.telemetry.topic_capacity);
    let abort = Arc::new(AtomicBool::new(false));

    let tokio_rt = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    tokio_rt.spawn(telemetry_logger(
        telemetry_topic.subscribe(),
        Duration::from_millis(settings.telemetry.interval_ms),
    ));
    tokio_rt.spawn(abort_listener(Arc::clone(&abort), Arc::clone(&bb)));

    let control = spawn_control_thread(&settings, mission, Arc::clone(&bb), telemetry_topic, Arc::clone(&abort))?;

    if settings.visualization.enabled {
        macroquad::Window::from_config(
            graphics::window_conf(),
            graphics::run_visualization_loop(Arc::clone(&bb), settings.sim.clone(), settings.visualization.scale),
        );
        info!("Visualization window closed.");
        abort.store(true, Ordering::Relaxed);
    }

    let exit = control.join().map_err(|_| anyhow!("control thread panicked"))??;
    info!(?exit, "Tracer finished.");
    tokio_rt.shutdown_timeout(Duration::from_millis(100));
    Ok(())
}

fn spawn_control_thread(
    settings: &Settings,
    mission: MissionTable,
    bb: Blackboard,
    telemetry_topic: Topic<Telemetry>,
    abort: Arc<AtomicBool>,
) -> anyhow::Result<JoinHandle<anyhow::Result<LoopExit>>> {
    let drive_config = settings.drive_config();
    let period = Duration::from_millis(settings.control.tick_ms);
    let plant = SimPlant::new(
        settings.sim.clone(),
        settings.robot,
        drive_config.tick_period,
        abort,
    );

    info!("Spawning control thread...");
    let handle = std::thread::Builder::new()
        .name("control".into())
        .spawn(move || {
            info!("Control thread started.");
            let drive = DriveController::new(&drive_config).context("drive configuration")?;
            let sequencer = Sequencer::new(mission, &drive).context("mission table")?;
            let mut control = ControlLoop::new(plant, drive, sequencer);
            set_running(&bb, true);
            let exit = control.run(period, |lp, telemetry| {
                publish(&bb, telemetry, lp.plant().pose());
                telemetry_topic.publish(telemetry.clone());
            });
            set_running(&bb, false);
            info!(
                phase = %control.sequencer().phase(),
                distance = control.drive().distance(),
                heading = control.drive().heading(),
                "Mission ended."
            );
            if exit == LoopExit::Aborted {
                raise_fault(&bb, "aborted by operator");
            }
            Ok(exit)
        })?;
    Ok(handle)
}

/// Log the latest telemetry every `interval`.
async fn telemetry_logger(mut telemetry: Subscription<Telemetry>, interval: Duration) {
    info!("Telemetry logger started.");
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    let mut latest: Option<Arc<Telemetry>> = None;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(t) = latest.take() {
                    info!(
                        tick = t.tick,
                        phase = %t.phase,
                        distance = t.distance,
                        heading = t.heading,
                        command = %t.command,
                        rgb = ?(t.rgb.r, t.rgb.g, t.rgb.b),
                        range_cm = t.range_cm,
                        "telemetry"
                    );
                }
            }
            msg = telemetry.recv() => match msg {
                Some(t) => latest = Some(t),
                None => {
                    info!(skipped = telemetry.skipped(), "Telemetry topic closed. Exiting telemetry logger.");
                    break;
                }
            },
        }
    }
}

/// Raise the abort input on Ctrl-C.
async fn abort_listener(abort: Arc<AtomicBool>, bb: Blackboard) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            warn!("Ctrl-C received. Stopping the robot.");
            abort.store(true, Ordering::Relaxed);
        }
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            raise_fault(&bb, "abort input unavailable");
        }
    }
}
