//! Optional reporting of intermediate segmentation artifacts
//!
//! Observers never influence the result. `DebugCanvas` assembles the
//! artifacts into one debug sheet that can be written to disk.

use crate::segmentation::steps::background::BackgroundSuppression;
use crate::segmentation::steps::filter::Verdict;
use crate::segmentation::steps::scan::{scan_row, Candidate};
use crate::segmentation::{Character, Rect};
use image::{imageops, DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use std::path::Path;

/// Hooks called by the pipeline, in pipeline order
pub trait SegmentationObserver {
    fn on_foreground(
        &mut self,
        _source: &RgbImage,
        _background: &BackgroundSuppression,
        _composited: &RgbImage,
    ) {
    }

    /// Called for every seeded candidate, accepted or not, in column order
    fn on_candidate(
        &mut self,
        _composited: &RgbImage,
        _candidate: &Candidate,
        _verdict: &Verdict,
    ) {
    }

    fn on_clusters(&mut self, _refined: &GrayImage, _rects: &[Rect]) {}

    fn on_characters(&mut self, _characters: &[Character]) {}
}

impl SegmentationObserver for () {}

const MARK_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
const SEED_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const FRAME_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Sampled fills shown in the second column
const MAX_SAMPLES: u32 = 6;
/// Characters shown in the third column
const MAX_CHARACTERS: usize = 5;

/// Debug sheet of 3 x 6 image-sized tiles.
///
/// Column 0: source, grayscale, blurred, foreground mask, composited image.
/// Column 1: up to six sampled accepted fills with the scan line and seed.
/// Column 2: refined mask with clustered rectangles, then the characters.
pub struct DebugCanvas {
    canvas: RgbImage,
    tile_w: u32,
    tile_h: u32,
    samples: u32,
}

impl DebugCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut canvas = RgbImage::new(width * 3, height * 6);
        if width > 0 && height > 0 {
            draw_hollow_rect_mut(
                &mut canvas,
                imageproc::rect::Rect::at(0, (height * 5) as i32).of_size(width, height),
                FRAME_COLOR,
            );
        }
        Self {
            canvas,
            tile_w: width,
            tile_h: height,
            samples: 0,
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.canvas
    }

    pub fn save(&self, path: &Path) -> Result<(), image::ImageError> {
        self.canvas.save(path)
    }

    fn place(&mut self, tile: &RgbImage, column: u32, row: u32) {
        imageops::replace(
            &mut self.canvas,
            tile,
            (column * self.tile_w) as i64,
            (row * self.tile_h) as i64,
        );
    }

    fn place_gray(&mut self, tile: &GrayImage, column: u32, row: u32) {
        let rgb = DynamicImage::ImageLuma8(tile.clone()).to_rgb8();
        self.place(&rgb, column, row);
    }
}

impl SegmentationObserver for DebugCanvas {
    fn on_foreground(
        &mut self,
        source: &RgbImage,
        background: &BackgroundSuppression,
        composited: &RgbImage,
    ) {
        self.place(source, 0, 0);
        self.place_gray(&background.gray, 0, 1);
        self.place_gray(&background.blurred, 0, 2);
        self.place_gray(&background.mask, 0, 3);
        self.place(composited, 0, 4);
    }

    fn on_candidate(&mut self, composited: &RgbImage, candidate: &Candidate, verdict: &Verdict) {
        // Sample roughly evenly across the width
        let step = (self.tile_w / 20).max(1);
        if !verdict.is_accepted() || candidate.seed.0 % step != 0 || self.samples >= MAX_SAMPLES {
            return;
        }

        let mut tile = candidate.overlay(composited);
        let row = scan_row(self.tile_h) as f32;
        draw_line_segment_mut(&mut tile, (0.0, row), (self.tile_w as f32, row), MARK_COLOR);
        draw_filled_circle_mut(
            &mut tile,
            (candidate.seed.0 as i32, candidate.seed.1 as i32),
            3,
            SEED_COLOR,
        );
        let slot = self.samples;
        self.place(&tile, 1, slot);
        self.samples += 1;
    }

    fn on_clusters(&mut self, refined: &GrayImage, rects: &[Rect]) {
        let mut tile = DynamicImage::ImageLuma8(refined.clone()).to_rgb8();
        for rect in rects {
            draw_hollow_rect_mut(&mut tile, (*rect).into(), MARK_COLOR);
        }
        self.place(&tile, 2, 0);
    }

    fn on_characters(&mut self, characters: &[Character]) {
        for (i, character) in characters.iter().take(MAX_CHARACTERS).enumerate() {
            let row = i as u32 + 1;
            self.place_gray(&character.image, 2, row);
            let (w, h) = character.image.dimensions();
            draw_hollow_rect_mut(
                &mut self.canvas,
                imageproc::rect::Rect::at((self.tile_w * 2) as i32, (self.tile_h * row) as i32)
                    .of_size(w.max(1), h.max(1)),
                MARK_COLOR,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SegmentationParams;
    use crate::segmentation::Segmenter;
    use image::Luma;

    const OVERLAY_WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    /// Four dark 40x50 blocks at x = 10, 58, 106, 154
    fn blocks(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            if (15..65).contains(&y) && x >= 10 && x < 194 && (x - 10) % 48 < 40 {
                Rgb([40, 40, 40])
            } else {
                Rgb([230, 230, 230])
            }
        })
    }

    fn tile_has(canvas: &DebugCanvas, column: u32, row: u32, color: Rgb<u8>) -> bool {
        let (w, h) = (canvas.tile_w, canvas.tile_h);
        (0..h).any(|y| {
            (0..w).any(|x| *canvas.image().get_pixel(column * w + x, row * h + y) == color)
        })
    }

    #[test]
    fn test_segment_observed_fills_source_and_sample_tiles() {
        let img = blocks(200, 80);
        let mut canvas = DebugCanvas::new(200, 80);

        let segmentation = Segmenter::new(SegmentationParams::default())
            .segment_observed(&img, None, &mut canvas)
            .unwrap();
        assert_eq!(segmentation.characters.len(), 4);

        // Source copied unchanged into the first tile
        assert_eq!(*canvas.image().get_pixel(5, 5), Rgb([230, 230, 230]));
        assert_eq!(*canvas.image().get_pixel(30, 40), Rgb([40, 40, 40]));

        // More than six accepted seeds sit on the sampling grid
        assert_eq!(canvas.samples, MAX_SAMPLES);
        for row in 0..MAX_SAMPLES {
            assert!(tile_has(&canvas, 1, row, OVERLAY_WHITE));
            assert!(tile_has(&canvas, 1, row, SEED_COLOR));
        }
    }

    #[test]
    fn test_rejected_and_off_grid_candidates_are_not_sampled() {
        let img = RgbImage::from_pixel(200, 80, Rgb([40, 40, 40]));
        let mut canvas = DebugCanvas::new(200, 80);
        let candidate = |x: u32| Candidate {
            seed: (x, 40),
            rect: Rect::new(x, 20, 10, 10),
            fill: GrayImage::from_pixel(10, 10, Luma([255])),
            mask: GrayImage::from_pixel(10, 10, Luma([255])),
        };

        canvas.on_candidate(&img, &candidate(20), &Verdict::RejectedSize);
        canvas.on_candidate(&img, &candidate(21), &Verdict::Accepted { density: 100.0 });
        assert_eq!(canvas.samples, 0);
        assert!(!tile_has(&canvas, 1, 0, OVERLAY_WHITE));

        canvas.on_candidate(&img, &candidate(30), &Verdict::Accepted { density: 100.0 });
        assert_eq!(canvas.samples, 1);
        assert!(tile_has(&canvas, 1, 0, OVERLAY_WHITE));
    }

    #[test]
    fn test_canvas_is_three_by_six_tiles() {
        let canvas = DebugCanvas::new(40, 20);
        assert_eq!(canvas.image().dimensions(), (120, 120));
    }

    #[test]
    fn test_clusters_are_drawn_in_third_column() {
        let mut canvas = DebugCanvas::new(40, 20);
        let refined = GrayImage::from_pixel(40, 20, Luma([0]));

        canvas.on_clusters(&refined, &[Rect::new(5, 5, 10, 10)]);

        assert_eq!(*canvas.image().get_pixel(80 + 5, 5), MARK_COLOR);
        assert_eq!(*canvas.image().get_pixel(80 + 8, 8), Rgb([0, 0, 0]));
    }
}
