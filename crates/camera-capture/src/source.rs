//! Frame sources

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::{CameraError, VideoFrame};

/// Pull-based frame acquisition.
///
/// `Ok(None)` signals end of stream; `Err` is a transient read failure and
/// the caller may try again on the next tick.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;
}

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "pgm"];

/// Replays a directory of still images as a video stream, in file-name order
pub struct ImageSequence {
    files: Vec<PathBuf>,
    position: usize,
    opened_at: Instant,
}

impl ImageSequence {
    /// Scan `dir` for image files
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CameraError::Open(format!(
                "{}: no image frames found",
                dir.display()
            )));
        }

        info!("Opened image sequence {} ({} frames)", dir.display(), files.len());

        Ok(Self {
            files,
            position: 0,
            opened_at: Instant::now(),
        })
    }

    /// Number of frames in the sequence
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the sequence has no frames
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        let sequence = self.position as u32;
        // Advance first so an undecodable file is skipped, not retried forever
        self.position += 1;

        debug!("Reading frame {} from {}", sequence, path.display());
        let image = image::open(path)
            .map_err(|e| CameraError::Decode(format!("{}: {}", path.display(), e)))?;

        let timestamp_ns = self.opened_at.elapsed().as_nanos() as u64;
        Ok(Some(VideoFrame::from_rgb_image(image.to_rgb8(), timestamp_ns, sequence)))
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
