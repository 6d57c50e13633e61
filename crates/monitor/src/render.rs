//! Renderers: what happens to each analysed frame for display

use ab_glyph::{FontVec, PxScale};
use alerting::AlarmCause;
use camera_capture::VideoFrame;
use dms::{AlertnessState, FaceAnalysis, FrameAnalysis, Point};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_polygon_mut, draw_text_mut};
use imageproc::geometry::convex_hull;
use imageproc::point::Point as PixelPoint;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::MonitorError;

const CONTOUR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT: Rgb<u8> = Rgb([255, 0, 0]);
const STATUS_BAR_HEIGHT: u32 = 12;
const TEXT_SCALE: f32 = 18.0;

/// Receives every processed frame with its analysis
pub trait Renderer {
    fn render(&mut self, frame: &VideoFrame, analysis: &FrameAnalysis) -> Result<(), MonitorError>;
}

/// Writes the overlay values to the log
#[derive(Debug, Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn render(&mut self, frame: &VideoFrame, analysis: &FrameAnalysis) -> Result<(), MonitorError> {
        match &analysis.face {
            Some(face) => debug!(
                frame = frame.sequence,
                state = %face.state,
                ear = %format_ratio(face.ear),
                mar = %format_ratio(face.mar),
                eyes_closed_frames = face.eyes_closed_frames,
                yawn_frames = face.yawn_frames,
                "face"
            ),
            None => debug!(frame = frame.sequence, state = %analysis.state, "no face"),
        }

        if let Some(cause) = analysis.alarm {
            warn!(frame = frame.sequence, "{}", alarm_banner(cause));
        }
        Ok(())
    }
}

fn format_ratio(value: Option<f32>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v))
}

fn alarm_banner(cause: AlarmCause) -> &'static str {
    match cause {
        AlarmCause::ClosedEyes => "EYES CLOSED!",
        AlarmCause::Yawning => "YAWN DETECTED!",
    }
}

/// Draws region contours and a state-coloured status bar, then saves the
/// frame as PNG. With a font loaded, the label, ratios and alarm banner are
/// written onto the frame as well.
pub struct OverlayRenderer {
    output_dir: PathBuf,
    font: Option<FontVec>,
}

impl OverlayRenderer {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, MonitorError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)
            .map_err(|e| MonitorError::Render(format!("{}: {}", output_dir.display(), e)))?;
        info!("Writing annotated frames to {}", output_dir.display());
        Ok(Self {
            output_dir,
            font: None,
        })
    }

    /// Load a TrueType/OpenType font for the text overlay
    pub fn with_font(mut self, font_path: impl AsRef<Path>) -> Result<Self, MonitorError> {
        let font_path = font_path.as_ref();
        let bytes = std::fs::read(font_path)
            .map_err(|e| MonitorError::Render(format!("{}: {}", font_path.display(), e)))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| MonitorError::Render(format!("{}: {}", font_path.display(), e)))?;
        info!("Overlay font: {}", font_path.display());
        self.font = Some(font);
        Ok(self)
    }

    /// Annotate a copy of `frame`
    pub fn annotate(&self, frame: &VideoFrame, analysis: &FrameAnalysis) -> Option<RgbImage> {
        let mut image = frame.to_rgb_image()?;

        if let Some(face) = &analysis.face {
            draw_face(&mut image, face);
        }

        let width = image.width();
        let height = STATUS_BAR_HEIGHT.min(image.height());
        if width > 0 && height > 0 {
            let bar = Rect::at(0, 0).of_size(width, height);
            draw_filled_rect_mut(&mut image, bar, state_colour(analysis.state));
        }

        if let Some(font) = &self.font {
            draw_text_lines(&mut image, font, &overlay_lines(analysis));
        }
        Some(image)
    }

    fn path_for(&self, frame: &VideoFrame) -> PathBuf {
        self.output_dir.join(format!("frame_{:06}.png", frame.sequence))
    }
}

impl Renderer for OverlayRenderer {
    fn render(&mut self, frame: &VideoFrame, analysis: &FrameAnalysis) -> Result<(), MonitorError> {
        let image = self.annotate(frame, analysis).ok_or_else(|| {
            MonitorError::Render(format!("frame {} has an invalid buffer", frame.sequence))
        })?;
        let path = self.path_for(frame);
        image
            .save(&path)
            .map_err(|e| MonitorError::Render(format!("{}: {}", path.display(), e)))
    }
}

/// Text shown on the frame: label, ratios, then the alarm banner if one fired
fn overlay_lines(analysis: &FrameAnalysis) -> Vec<String> {
    let mut lines = vec![analysis.state.label().to_string()];
    if let Some(face) = &analysis.face {
        lines.push(format!("EAR: {}", format_ratio(face.ear)));
        lines.push(format!("MAR: {}", format_ratio(face.mar)));
    }
    if let Some(cause) = analysis.alarm {
        lines.push(alarm_banner(cause).to_string());
    }
    lines
}

fn draw_text_lines(image: &mut RgbImage, font: &FontVec, lines: &[String]) {
    let scale = PxScale::from(TEXT_SCALE);
    let mut y = STATUS_BAR_HEIGHT as i32 + 4;
    for line in lines {
        draw_text_mut(image, TEXT, 10, y, scale, font, line);
        y += TEXT_SCALE as i32 + 4;
    }
}

fn draw_face(image: &mut RgbImage, face: &FaceAnalysis) {
    for region in [&face.left_eye, &face.right_eye, &face.mouth] {
        let pixels = to_pixels(region);
        let hull = convex_hull(pixels.as_slice());
        // A hull needs three corners to be a polygon
        if hull.len() < 3 {
            continue;
        }
        let polygon: Vec<PixelPoint<f32>> = hull
            .iter()
            .map(|p| PixelPoint::new(p.x as f32, p.y as f32))
            .collect();
        draw_hollow_polygon_mut(image, &polygon, CONTOUR);
    }
}

fn to_pixels(points: &[Point]) -> Vec<PixelPoint<i32>> {
    points
        .iter()
        .map(|p| PixelPoint::new(p.x.round() as i32, p.y.round() as i32))
        .collect()
}

fn state_colour(state: AlertnessState) -> Rgb<u8> {
    match state {
        AlertnessState::Awake => Rgb([0, 255, 0]),
        AlertnessState::Drowsy => Rgb([255, 165, 0]),
        AlertnessState::ClosedEyes | AlertnessState::Yawning => Rgb([255, 0, 0]),
    }
}
