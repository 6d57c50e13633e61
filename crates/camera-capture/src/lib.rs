//! Camera Capture Library for the Drowsiness Monitor
//!
//! Provides the frame type handed to the landmark detector and the
//! sources that produce frames:
//! - `VideoFrame`: decoded RGB frame with grayscale/equalisation helpers
//! - `FrameSource`: pull-based frame acquisition
//! - `ImageSequence`: replays a directory of still images in name order

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{FrameSource, ImageSequence};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open frame source: {0}")]
    Open(String),

    #[error("Frame read failed: {0}")]
    Read(String),

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Invalid frame buffer: expected {expected} bytes, got {actual}")]
    Buffer { expected: usize, actual: usize },
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Directory of still frames to replay
    pub frames_dir: PathBuf,
    /// Maximum frame width handed to detection (larger frames are downscaled)
    pub width: u32,
    /// Maximum frame height handed to detection
    pub height: u32,
    /// Target FPS
    pub fps: u32,
    /// Consecutive read failures tolerated before the loop gives up
    pub max_consecutive_failures: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            frames_dir: PathBuf::from("frames"),
            width: 640,
            height: 480,
            fps: 15,
            max_consecutive_failures: 30,
        }
    }
}

impl CameraConfig {
    /// Interval between frames at the target rate
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}
