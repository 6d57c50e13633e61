//! Application configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables prefixed `DROWSY__` (sections separated by `__`), e.g.
//! `DROWSY__DMS__EYE_AR_THRESHOLD=0.2`.

use alerting::AlertConfig;
use camera_capture::CameraConfig;
use dms::DmsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "drowsiness-monitor.toml";

const ENV_PREFIX: &str = "DROWSY";

/// Landmark detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Recorded 68-point landmarks (JSON Lines)
    pub landmarks_path: PathBuf,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            landmarks_path: PathBuf::from("landmarks.jsonl"),
        }
    }
}

/// Rendering settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Write annotated frames here when set
    pub output_dir: Option<PathBuf>,
    /// TrueType/OpenType font for the label and ratio text; contours only
    /// when unset
    pub font_path: Option<PathBuf>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Maximum level: trace, debug, info, warn, error
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub dms: DmsConfig,
    pub alerting: AlertConfig,
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub render: RenderConfig,
    pub logging: LogConfig,
}

impl AppConfig {
    /// Load configuration. An explicit `path` must exist; the default file
    /// is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        let (file, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        ::config::Config::builder()
            .add_source(::config::File::from(file).required(required))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
