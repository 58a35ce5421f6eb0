//! Scan-line seeding and color-tolerant region growing
//!
//! Only the middle row is sampled: every foreground pixel on it seeds its own
//! flood fill over the composited image. A character lying entirely above or
//! below the middle row is never seeded.

use crate::segmentation::Rect;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::region_labelling::Connectivity;
use rayon::prelude::*;

/// Color painted over filled pixels in overlays
const OVERLAY_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// A region grown from one scan-line seed
#[derive(Debug, Clone)]
pub struct Candidate {
    pub seed: (u32, u32),
    /// Bounding box of the raw fill
    pub rect: Rect,
    /// Raw fill, cropped to `rect`
    pub fill: GrayImage,
    /// Fill intersected with the foreground mask, cropped to `rect`
    pub mask: GrayImage,
}

impl Candidate {
    /// Foreground pixels of the intersected mask inside `rect`
    pub fn foreground_pixels(&self) -> u64 {
        self.mask.pixels().filter(|p| p.0[0] != 0).count() as u64
    }

    /// Copy of `composited` with the raw fill painted over it
    pub fn overlay(&self, composited: &RgbImage) -> RgbImage {
        let mut canvas = composited.clone();
        for (x, y, p) in self.fill.enumerate_pixels() {
            if p.0[0] != 0 {
                canvas.put_pixel(self.rect.x + x, self.rect.y + y, OVERLAY_COLOR);
            }
        }
        canvas
    }
}

/// Row that gets sampled for seeds
pub fn scan_row(height: u32) -> u32 {
    height / 2
}

/// Columns of the scan row that hold foreground pixels
pub fn seed_columns(foreground: &GrayImage) -> Vec<u32> {
    let (width, height) = foreground.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let row = scan_row(height);
    (0..width)
        .filter(|&x| foreground.get_pixel(x, row).0[0] != 0)
        .collect()
}

/// Grow one candidate from every seed column, in column order
pub fn scan(
    composited: &RgbImage,
    foreground: &GrayImage,
    tolerance: u32,
    connectivity: Connectivity,
) -> Vec<Candidate> {
    let row = scan_row(foreground.height());
    seed_columns(foreground)
        .into_par_iter()
        .map(|x| grow_candidate(composited, foreground, (x, row), tolerance, connectivity))
        .collect()
}

/// Flood fill from `seed`, then strip pixels outside the foreground mask
pub fn grow_candidate(
    composited: &RgbImage,
    foreground: &GrayImage,
    seed: (u32, u32),
    tolerance: u32,
    connectivity: Connectivity,
) -> Candidate {
    let (rect, fill) = flood_fill(composited, seed, tolerance, connectivity);
    let mask = GrayImage::from_fn(rect.width, rect.height, |x, y| {
        let inside = fill.get_pixel(x, y).0[0] != 0
            && foreground.get_pixel(rect.x + x, rect.y + y).0[0] != 0;
        Luma([if inside { 255 } else { 0 }])
    });

    Candidate {
        seed,
        rect,
        fill,
        mask,
    }
}

/// Fixed-range flood fill: a pixel joins when every channel lies within
/// `tolerance` of the seed's own color. Returns the bounding box and the fill
/// cropped to it.
pub fn flood_fill(
    image: &RgbImage,
    seed: (u32, u32),
    tolerance: u32,
    connectivity: Connectivity,
) -> (Rect, GrayImage) {
    let (width, height) = image.dimensions();
    let tolerance = tolerance.min(255) as i16;
    let seed_color = image.get_pixel(seed.0, seed.1).0;
    let in_range = |p: &Rgb<u8>| {
        p.0.iter()
            .zip(seed_color.iter())
            .all(|(&c, &s)| (c as i16 - s as i16).abs() <= tolerance)
    };

    let mut visited = vec![false; width as usize * height as usize];
    let mut filled = Vec::new();
    let mut stack = vec![seed];
    visited[(seed.1 * width + seed.0) as usize] = true;

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (seed.0, seed.1, seed.0, seed.1);

    while let Some((x, y)) = stack.pop() {
        filled.push((x, y));
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);

        for (nx, ny) in neighbors(x, y, width, height, connectivity) {
            let idx = (ny * width + nx) as usize;
            if !visited[idx] && in_range(image.get_pixel(nx, ny)) {
                visited[idx] = true;
                stack.push((nx, ny));
            }
        }
    }

    let rect = Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1);
    let mut fill = GrayImage::new(rect.width, rect.height);
    for (x, y) in filled {
        fill.put_pixel(x - rect.x, y - rect.y, Luma([255]));
    }
    (rect, fill)
}

fn neighbors(
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    connectivity: Connectivity,
) -> impl Iterator<Item = (u32, u32)> {
    const FOUR: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
    const DIAGONAL: [(i64, i64); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

    let four: &'static [(i64, i64)] = &FOUR;
    let diagonal: &'static [(i64, i64)] = match connectivity {
        Connectivity::Four => &[],
        Connectivity::Eight => &DIAGONAL,
    };

    four.iter()
        .chain(diagonal.iter())
        .filter_map(move |&(dx, dy)| {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                None
            } else {
                Some((nx as u32, ny as u32))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone_image() -> RgbImage {
        // Dark block with a slightly lighter right half, on black background
        RgbImage::from_fn(40, 20, |x, y| {
            if !(5..35).contains(&x) || !(4..16).contains(&y) {
                Rgb([0, 0, 0])
            } else if x < 20 {
                Rgb([60, 60, 60])
            } else {
                Rgb([90, 90, 90])
            }
        })
    }

    #[test]
    fn test_flood_fill_uses_seed_color_range() {
        let img = two_tone_image();

        let (rect, fill) = flood_fill(&img, (10, 10), 39, Connectivity::Four);
        assert_eq!(rect, Rect::new(5, 4, 30, 12));
        assert!(fill.pixels().all(|p| p.0[0] == 255));

        let (rect, _) = flood_fill(&img, (10, 10), 20, Connectivity::Four);
        assert_eq!(rect, Rect::new(5, 4, 15, 12));
    }

    #[test]
    fn test_flood_fill_connectivity() {
        // Two pixels touching only at a corner
        let mut img = RgbImage::new(4, 4);
        img.put_pixel(1, 1, Rgb([100, 100, 100]));
        img.put_pixel(2, 2, Rgb([100, 100, 100]));

        let (four, _) = flood_fill(&img, (1, 1), 10, Connectivity::Four);
        let (eight, _) = flood_fill(&img, (1, 1), 10, Connectivity::Eight);

        assert_eq!(four, Rect::new(1, 1, 1, 1));
        assert_eq!(eight, Rect::new(1, 1, 2, 2));
    }

    #[test]
    fn test_candidate_mask_is_intersected_with_foreground() {
        let img = RgbImage::from_pixel(10, 10, Rgb([50, 50, 50]));
        let foreground =
            GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([255]) } else { Luma([0]) });

        let candidate = grow_candidate(&img, &foreground, (2, 5), 10, Connectivity::Four);

        assert_eq!(candidate.rect, Rect::new(0, 0, 10, 10));
        assert_eq!(candidate.foreground_pixels(), 50);
    }

    #[test]
    fn test_scan_seeds_only_the_middle_row() {
        let img = RgbImage::from_pixel(8, 9, Rgb([50, 50, 50]));
        let foreground = GrayImage::from_fn(8, 9, |x, y| {
            if y == 4 && (x == 1 || x == 6) {
                Luma([255])
            } else if y == 0 {
                Luma([255])
            } else {
                Luma([0])
            }
        });

        assert_eq!(seed_columns(&foreground), vec![1, 6]);
        let candidates = scan(&img, &foreground, 10, Connectivity::Four);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].seed, (1, 4));
        assert_eq!(candidates[1].seed, (6, 4));
    }

    #[test]
    fn test_overlay_paints_fill() {
        let img = two_tone_image();
        let candidate = grow_candidate(
            &img,
            &GrayImage::from_pixel(40, 20, Luma([255])),
            (10, 10),
            20,
            Connectivity::Four,
        );

        let overlay = candidate.overlay(&img);
        assert_eq!(*overlay.get_pixel(10, 10), OVERLAY_COLOR);
        assert_eq!(*overlay.get_pixel(25, 10), Rgb([90, 90, 90]));
    }
}
