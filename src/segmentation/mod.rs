//! Captcha segmentation core
//!
//! Splits a color captcha into binary per-character masks ordered left to right.

pub mod pipeline;
pub mod steps;

pub use pipeline::{segment, Segmentation, Segmenter, StepTiming};

use image::GrayImage;
use serde::Serialize;

/// Axis-aligned bounding box in image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl From<Rect> for imageproc::rect::Rect {
    fn from(rect: Rect) -> Self {
        imageproc::rect::Rect::at(rect.x as i32, rect.y as i32).of_size(rect.width, rect.height)
    }
}

/// Requested size of every output character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
}

impl OutputSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::str::FromStr for OutputSize {
    type Err = String;

    /// Parse `WIDTHxHEIGHT`, e.g. `64x64`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", s))?;
        let width = width
            .trim()
            .parse()
            .map_err(|e| format!("invalid width {:?}: {}", width, e))?;
        let height = height
            .trim()
            .parse()
            .map_err(|e| format!("invalid height {:?}: {}", height, e))?;
        Ok(Self { width, height })
    }
}

/// One segmented character: a binary (0/255) mask cut from the refined
/// character mask, plus the clustered rectangle it was cut from
#[derive(Debug, Clone)]
pub struct Character {
    pub image: GrayImage,
    pub rect: Rect,
}

impl Character {
    pub fn foreground_pixels(&self) -> u32 {
        self.image.pixels().filter(|p| p.0[0] != 0).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_size_parses() {
        assert_eq!("64x64".parse::<OutputSize>().unwrap(), OutputSize::new(64, 64));
        assert_eq!("32X48".parse::<OutputSize>().unwrap(), OutputSize::new(32, 48));
        assert!("64".parse::<OutputSize>().is_err());
        assert!("ax64".parse::<OutputSize>().is_err());
    }

    #[test]
    fn test_rect_edges() {
        let rect = Rect::new(10, 5, 20, 30);
        assert_eq!(rect.right(), 30);
        assert_eq!(rect.bottom(), 35);
        assert_eq!(rect.area(), 600);
    }
}
