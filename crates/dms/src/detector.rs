//! Landmark detection seam and the replay detector

use camera_capture::VideoFrame;
use image::GrayImage;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, info};

use crate::landmarks::LandmarkSet;
use crate::DmsError;

/// Frame prepared for landmark detection: equalised grayscale plus the
/// identity of the source frame
#[derive(Debug, Clone)]
pub struct PreparedFrame {
    pub sequence: u32,
    pub timestamp_ns: u64,
    pub gray: GrayImage,
}

impl PreparedFrame {
    pub fn new(frame: &VideoFrame) -> Self {
        Self {
            sequence: frame.sequence,
            timestamp_ns: frame.timestamp_ns,
            gray: frame.to_equalized_grayscale(),
        }
    }
}

/// Face + 68-point landmark detector.
///
/// Returns zero or more faces in detector order; every set is already
/// validated to 68 points.
pub trait LandmarkDetector {
    fn detect(&mut self, frame: &PreparedFrame) -> Result<Vec<LandmarkSet>, DmsError>;
}

#[derive(Debug, Deserialize)]
struct ReplayRecord {
    frame: u32,
    #[serde(default)]
    faces: Vec<Vec<[f32; 2]>>,
}

/// Replays landmarks recorded offline, keyed by frame sequence number.
///
/// Input is JSON Lines, one record per frame:
/// `{"frame": 0, "faces": [[[x, y], ... 68 points], ...]}`.
/// Frames with no record yield no faces.
#[derive(Debug, Default)]
pub struct LandmarkReplay {
    frames: HashMap<u32, Vec<LandmarkSet>>,
}

impl LandmarkReplay {
    /// Load and validate a recording
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DmsError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| DmsError::DetectorLoad(format!("{}: {}", path.display(), e)))?;
        let replay = Self::from_reader(BufReader::new(file))?;
        info!(
            "Loaded landmark recording {} ({} frames)",
            path.display(),
            replay.frames.len()
        );
        Ok(replay)
    }

    /// Parse a recording from any buffered reader
    pub fn from_reader(reader: impl BufRead) -> Result<Self, DmsError> {
        let mut frames = HashMap::new();

        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line =
                line.map_err(|e| DmsError::DetectorLoad(format!("line {}: {}", line_no, e)))?;
            if line.trim().is_empty() {
                continue;
            }

            let record: ReplayRecord = serde_json::from_str(&line)
                .map_err(|e| DmsError::DetectorLoad(format!("line {}: {}", line_no, e)))?;

            let faces = record
                .faces
                .into_iter()
                .map(LandmarkSet::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| DmsError::DetectorLoad(format!("line {}: {}", line_no, e)))?;

            frames.insert(record.frame, faces);
        }

        Ok(Self { frames })
    }

    /// Number of frames with a record
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if the recording has no frames
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl LandmarkDetector for LandmarkReplay {
    fn detect(&mut self, frame: &PreparedFrame) -> Result<Vec<LandmarkSet>, DmsError> {
        let faces = self.frames.get(&frame.sequence).cloned().unwrap_or_default();
        debug!("Frame {}: {} face(s) replayed", frame.sequence, faces.len());
        Ok(faces)
    }
}
