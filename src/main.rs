//! vivetrack - Eye and lip tracker sampling service
//!
//! Main entry point for the CLI application.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vivetrack::{
    config::Config,
    tracking::{LipShape, TrackingSession},
    SimulatedSdk,
};

/// How often the consumer side feeds dilation into calibration
const CALIBRATION_SAMPLE_MS: u64 = 50;

/// vivetrack - Eye and lip tracker sampling service
#[derive(Parser, Debug)]
#[command(name = "vivetrack", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Do not request eye tracking
    #[arg(long)]
    no_gaze: bool,

    /// Do not request lip tracking
    #[arg(long)]
    no_mouth: bool,

    /// Seconds between status reports
    #[arg(long, default_value_t = 1)]
    status_interval_secs: u64,

    /// Print status reports as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Save one lip camera picture (PGM) to this path and continue
    #[arg(long)]
    capture_image: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", vivetrack::NAME, vivetrack::VERSION);

    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    if args.no_gaze {
        config.tracking.gaze = false;
    }
    if args.no_mouth {
        config.tracking.mouth = false;
    }

    config.validate()?;

    info!("Gaze tracking requested: {}", config.tracking.gaze);
    info!("Mouth tracking requested: {}", config.tracking.mouth);
    info!("Poll interval: {} ms", config.tracking.poll_interval_ms);

    warn!("No native runtime binding in this build, using simulated tracker hardware");
    let sdk = Arc::new(SimulatedSdk::from_config(&config.simulated));
    let session = TrackingSession::new(sdk, &config.tracking);

    let outcome = session.initialize_detailed(config.tracking.gaze, config.tracking.mouth)?;
    info!(
        "Initialization complete (gaze: {}, mouth: {}, busy retries: {})",
        outcome.gaze_ok, outcome.mouth_ok, outcome.mouth_busy_retries
    );

    if !outcome.any() {
        warn!("Tracking unavailable: no subsystem could be initialized");
        return Ok(());
    }

    if let Some(ref path) = args.capture_image {
        save_mouth_image(&session, path)?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_status_loop(
        &session,
        Duration::from_secs(args.status_interval_secs.max(1)),
        args.json,
    ));

    session.teardown();
    info!("vivetrack stopped");
    Ok(())
}

/// Feed calibration and report status until a shutdown signal arrives
async fn run_status_loop(session: &TrackingSession, report_every: Duration, json: bool) {
    let mut report = tokio::time::interval(report_every);
    let mut calibrate = tokio::time::interval(Duration::from_millis(CALIBRATION_SAMPLE_MS));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
            _ = calibrate.tick() => {
                session.observe_latest_dilation();
            }
            _ = report.tick() => {
                report_status(session, json);
            }
        }
    }
}

fn report_status(session: &TrackingSession, json: bool) {
    let gaze = session.latest_gaze();
    let mouth = session.latest_mouth();
    let range = session.calibration_range();
    let stats = session.worker_monitor().map(|m| m.stats()).unwrap_or_default();

    let dilation = gaze.as_ref().and_then(|g| g.dilation());
    let jaw_open = mouth.as_ref().map(|m| m.shapes.get(LipShape::JawOpen));

    if json {
        let line = serde_json::json!({
            "handles": session.handles(),
            "stats": stats,
            "gaze_frame": gaze.as_ref().map(|g| g.frame_sequence),
            "mouth_frame": mouth.as_ref().map(|m| m.frame.frame_sequence),
            "dilation_mm": dilation,
            "dilation_normalized": dilation.and_then(|d| range.normalize(d)),
            "jaw_open": jaw_open,
            "calibration": range,
        });
        println!("{}", line);
        return;
    }

    info!(
        "iterations={} gaze_frames={} mouth_frames={} poll_errors={} dilation={:?} range=[{:.2}, {:.2}] jaw_open={:?}",
        stats.iterations,
        stats.gaze_frames,
        stats.mouth_frames,
        stats.poll_errors,
        dilation,
        range.min,
        range.max,
        jaw_open,
    );
}

fn save_mouth_image(session: &TrackingSession, path: &Path) -> anyhow::Result<()> {
    let Some(image) = session.capture_mouth_image() else {
        warn!("No lip camera image available");
        return Ok(());
    };

    let mut data = format!("P5\n{} {}\n255\n", image.width, image.height).into_bytes();
    data.extend_from_slice(&image.pixels);
    std::fs::write(path, data)?;

    info!(
        "Saved {}x{} lip camera image to {}",
        image.width,
        image.height,
        path.display()
    );
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
