//! Raster frames exchanged between render-prep and presentation.

use serde::{Deserialize, Serialize};

/// Packed RGB8 image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB bytes, `width * height * 3` long.
    pub pixels: Vec<u8>,
}

impl RasterFrame {
    pub const CHANNELS: usize = 3;

    /// Black frame of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * Self::CHANNELS],
        }
    }

    pub fn same_size(&self, other: &RasterFrame) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Linear blend `self * alpha + other * (1 - alpha)`.
    ///
    /// Returns `None` when the frames differ in size.
    pub fn blend(&self, other: &RasterFrame, alpha: f32) -> Option<RasterFrame> {
        if !self.same_size(other) || self.pixels.len() != other.pixels.len() {
            return None;
        }

        let alpha = alpha.clamp(0.0, 1.0);
        let pixels = self
            .pixels
            .iter()
            .zip(&other.pixels)
            .map(|(a, b)| (*a as f32 * alpha + *b as f32 * (1.0 - alpha)).round() as u8)
            .collect();

        Some(RasterFrame {
            width: self.width,
            height: self.height,
            pixels,
        })
    }
}
