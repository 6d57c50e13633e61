//! Video frame types and preprocessing

use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use imageproc::contrast::equalize_histogram_mut;

use crate::CameraError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds since the source was opened)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, CameraError> {
        let expected = (width as usize) * (height as usize) * 3;
        if data.len() != expected {
            return Err(CameraError::Buffer {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        })
    }

    /// Wrap a decoded RGB image
    pub fn from_rgb_image(image: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Copy the pixels into an `image` buffer for drawing or encoding
    pub fn to_rgb_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 3;
        let rgb = self.data.get(offset..offset + 3)?;
        Some([rgb[0], rgb[1], rgb[2]])
    }

    /// Convert to 8-bit luma
    pub fn to_grayscale(&self) -> GrayImage {
        match self.to_rgb_image() {
            Some(rgb) => imageops::grayscale(&rgb),
            None => GrayImage::new(self.width, self.height),
        }
    }

    /// Grayscale with a global histogram equalisation applied, the input
    /// expected by landmark detectors under uneven cabin lighting
    pub fn to_equalized_grayscale(&self) -> GrayImage {
        let mut gray = self.to_grayscale();
        equalize_histogram_mut(&mut gray);
        gray
    }

    /// Downscale (nearest neighbour) so the frame fits within the given bounds,
    /// preserving aspect ratio. Frames already within bounds are returned as-is.
    pub fn fit_within(self, max_width: u32, max_height: u32) -> VideoFrame {
        if self.width <= max_width && self.height <= max_height {
            return self;
        }
        let Some(rgb) = self.to_rgb_image() else {
            return self;
        };

        let scale = (max_width as f32 / self.width as f32)
            .min(max_height as f32 / self.height as f32);
        let width = ((self.width as f32 * scale).round() as u32).max(1);
        let height = ((self.height as f32 * scale).round() as u32).max(1);

        let resized = imageops::resize(&rgb, width, height, FilterType::Nearest);
        VideoFrame::from_rgb_image(resized, self.timestamp_ns, self.sequence)
    }
}
