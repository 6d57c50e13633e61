//! DMS analysis results handed to renderers

use alerting::AlarmCause;
use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::state::AlertnessState;

/// Per-face result of one processed frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceAnalysis {
    /// Left eye outline (6 points)
    pub left_eye: Vec<Point>,

    /// Right eye outline (6 points)
    pub right_eye: Vec<Point>,

    /// Mouth outline (20 points)
    pub mouth: Vec<Point>,

    /// Binocular eye aspect ratio, absent when both eyes are degenerate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear: Option<f32>,

    /// Mouth aspect ratio, absent when the mouth is degenerate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mar: Option<f32>,

    /// Label after this frame
    pub state: AlertnessState,

    /// Consecutive closed-eye frames so far
    pub eyes_closed_frames: u32,

    /// Consecutive yawning frames so far
    pub yawn_frames: u32,
}

/// Complete result of one processed frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Number of faces the detector returned
    pub faces_detected: usize,

    /// The face that drove the state machine (first detected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face: Option<FaceAnalysis>,

    /// Label after this frame (unchanged on frames without a face)
    pub state: AlertnessState,

    /// Alarm fired this frame, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm: Option<AlarmCause>,

    /// Consecutive frames without a face
    pub face_absent_frames: u32,
}

impl FrameAnalysis {
    /// Check if a face was processed
    pub fn face_detected(&self) -> bool {
        self.face.is_some()
    }

    /// Check if an alarm fired this frame
    pub fn alarm_fired(&self) -> bool {
        self.alarm.is_some()
    }
}
