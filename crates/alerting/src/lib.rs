//! Alerting System
//!
//! Decides when a sustained drowsiness signal turns into an audible alert:
//! minimum spacing between alerts, at most one alert sounding at a time,
//! and non-fatal playback failures.

mod arbiter;
mod sound;

pub use arbiter::{AlarmArbiter, AlarmCause, AlarmGate, AlarmStats, AlertConfig, PlaybackMode};
pub use sound::{from_config as sound_from_config, AlertSound, CommandSound, SilentSound};

use thiserror::Error;

/// Alerting error types
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Alert sound file not found: {0}")]
    MissingSound(String),

    #[error("Alert playback failed: {0}")]
    Playback(String),

    #[error("Invalid alert configuration: {0}")]
    Config(String),
}
