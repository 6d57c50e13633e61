//! Drowsiness Monitor
//!
//! Wires the frame source, landmark detector, DMS session, alarm arbiter
//! and renderers into one frame loop.

mod config;
mod pipeline;
mod render;

pub use config::{AppConfig, DetectorConfig, LogConfig, RenderConfig, DEFAULT_CONFIG_FILE};
pub use pipeline::{FrameLoop, LoopSummary};
pub use render::{LogRenderer, OverlayRenderer, Renderer};

use std::future::Future;

use alerting::{sound_from_config, AlarmArbiter, AlertError};
use camera_capture::{CameraError, ImageSequence};
use dms::{DmsError, DmsSession, LandmarkReplay};
use thiserror::Error;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Monitor error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Dms(#[from] DmsError),

    #[error(transparent)]
    Alert(#[from] AlertError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Frame source failed {0} times in a row")]
    TooManyFailures(u32),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Initialize logging
pub fn init_logging(config: &LogConfig) -> Result<(), MonitorError> {
    let level: Level = config
        .level
        .parse()
        .map_err(|_| MonitorError::Logging(format!("unknown level '{}'", config.level)))?;

    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);
    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| MonitorError::Logging(e.to_string()))
}

/// Run the monitor until the frames run out or Ctrl-C
pub async fn run(config: AppConfig) -> Result<LoopSummary, MonitorError> {
    run_until(config, shutdown_signal()).await
}

/// Run the monitor until the frames run out or `shutdown` completes
pub async fn run_until(
    config: AppConfig,
    shutdown: impl Future<Output = ()>,
) -> Result<LoopSummary, MonitorError> {
    config.alerting.validate()?;

    // Missing alert sound is fatal before any frame is read
    let sound = sound_from_config(&config.alerting)?;
    let arbiter = AlarmArbiter::new(&config.alerting, sound);
    let session = DmsSession::new(config.dms.clone(), arbiter)?;

    let detector = LandmarkReplay::open(&config.detector.landmarks_path)?;
    let source = ImageSequence::open(&config.camera.frames_dir)?;
    info!(
        "Replaying {} frames from {}",
        source.len(),
        config.camera.frames_dir.display()
    );

    let mut renderers: Vec<Box<dyn Renderer>> = vec![Box::new(LogRenderer)];
    if let Some(dir) = &config.render.output_dir {
        let mut overlay = OverlayRenderer::new(dir)?;
        if let Some(font_path) = &config.render.font_path {
            overlay = overlay.with_font(font_path)?;
        }
        renderers.push(Box::new(overlay));
    }

    FrameLoop::new(source, detector, session, renderers, config.camera.clone())
        .run(shutdown)
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
