//! Drowsiness Monitor - Main Entry Point

use anyhow::Context;
use monitor::{init_logging, run, AppConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("loading configuration")?;
    init_logging(&config.logging)?;

    info!("=== Drowsiness Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Press Ctrl-C to stop");

    let summary = run(config).await?;

    info!(
        "Stopped after {} frames ({} with a face, {} skipped), {} alarms fired",
        summary.frames, summary.frames_with_face, summary.skipped, summary.alarms.fired
    );
    Ok(())
}
