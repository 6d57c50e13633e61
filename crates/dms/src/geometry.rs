//! Eye and mouth aspect ratios from landmark regions

use serde::{Deserialize, Serialize};

use crate::landmarks::{EyeRegion, MouthRegion};

/// 2D landmark coordinate in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

/// Ratio of the two vertical spans to twice the horizontal span.
///
/// Returns `None` when the horizontal span is degenerate (face edge-on to
/// the camera or collapsed landmarks).
fn aspect_ratio(vertical_a: f32, vertical_b: f32, horizontal: f32) -> Option<f32> {
    if horizontal <= f32::EPSILON {
        return None;
    }
    Some((vertical_a + vertical_b) / (2.0 * horizontal))
}

/// Eye aspect ratio (EAR): low when the eye is closed.
///
/// Uses region positions 1-5 and 2-4 (vertical) over 0-3 (horizontal).
pub fn eye_aspect_ratio(eye: &EyeRegion) -> Option<f32> {
    let p = eye.points();
    aspect_ratio(p[1].distance(&p[5]), p[2].distance(&p[4]), p[0].distance(&p[3]))
}

/// Mouth aspect ratio (MAR): high when the mouth is wide open.
///
/// Uses region positions 2-10 and 4-8 (vertical) over 0-6 (horizontal).
pub fn mouth_aspect_ratio(mouth: &MouthRegion) -> Option<f32> {
    let p = mouth.points();
    aspect_ratio(p[2].distance(&p[10]), p[4].distance(&p[8]), p[0].distance(&p[6]))
}

/// Mean of the two eye ratios, falling back to whichever eye is usable
pub fn binocular_ratio(left: Option<f32>, right: Option<f32>) -> Option<f32> {
    match (left, right) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}
