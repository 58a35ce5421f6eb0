use super::scan::Candidate;
use image::{GrayImage, Luma};
use rayon::prelude::*;

/// Union of all accepted candidate masks, as one image-sized mask.
///
/// Built as a parallel fold of per-thread buffers reduced with logical OR,
/// so the result does not depend on evaluation order.
pub fn aggregate(candidates: &[Candidate], width: u32, height: u32) -> GrayImage {
    candidates
        .par_iter()
        .fold(
            || GrayImage::new(width, height),
            |mut acc, candidate| {
                stamp(&mut acc, candidate);
                acc
            },
        )
        .reduce(|| GrayImage::new(width, height), merge)
}

/// OR a candidate's cropped mask into `acc` at its rectangle offset
pub fn stamp(acc: &mut GrayImage, candidate: &Candidate) {
    let rect = candidate.rect;
    for (x, y, p) in candidate.mask.enumerate_pixels() {
        if p.0[0] != 0 {
            acc.put_pixel(rect.x + x, rect.y + y, Luma([255]));
        }
    }
}

/// Pixel-wise logical OR of two same-sized masks
pub fn merge(mut a: GrayImage, b: GrayImage) -> GrayImage {
    for (pa, pb) in a.pixels_mut().zip(b.pixels()) {
        if pb.0[0] != 0 {
            *pa = Luma([255]);
        }
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::Rect;

    fn candidate(rect: Rect) -> Candidate {
        Candidate {
            seed: (rect.x, rect.y),
            rect,
            fill: GrayImage::from_pixel(rect.width, rect.height, Luma([255])),
            mask: GrayImage::from_pixel(rect.width, rect.height, Luma([255])),
        }
    }

    #[test]
    fn test_aggregate_is_union() {
        let candidates = vec![
            candidate(Rect::new(0, 0, 3, 3)),
            candidate(Rect::new(2, 2, 3, 3)),
        ];

        let mask = aggregate(&candidates, 6, 6);

        let set = mask.pixels().filter(|p| p.0[0] == 255).count();
        assert_eq!(set, 9 + 9 - 1);
        assert_eq!(mask.get_pixel(5, 5).0[0], 0);
        assert_eq!(mask.get_pixel(4, 4).0[0], 255);
    }

    #[test]
    fn test_aggregate_ignores_order() {
        let mut candidates = vec![
            candidate(Rect::new(0, 0, 2, 4)),
            candidate(Rect::new(3, 1, 2, 2)),
            candidate(Rect::new(1, 3, 4, 1)),
        ];
        let forward = aggregate(&candidates, 6, 6);
        candidates.reverse();
        let backward = aggregate(&candidates, 6, 6);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_aggregate_of_nothing_is_empty() {
        let mask = aggregate(&[], 4, 4);
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }
}
