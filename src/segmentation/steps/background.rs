use crate::params::SegmentationParams;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::filter::box_filter;

/// Intermediate images of background suppression
#[derive(Debug, Clone)]
pub struct BackgroundSuppression {
    pub gray: GrayImage,
    pub blurred: GrayImage,
    /// Otsu level chosen on the blurred histogram
    pub level: u8,
    /// Binary foreground mask (255 = ink)
    pub mask: GrayImage,
}

/// Build the foreground mask: grayscale, box blur, inverted Otsu
/// binarization, then one erosion to detach touching strokes
pub fn suppress(image: &RgbImage, params: &SegmentationParams) -> BackgroundSuppression {
    let gray = luma_bt601(image);

    // Box filter takes radii, so even kernel sizes widen to the next odd size.
    // Borders replicate the edge pixel rather than reflecting.
    let blurred = box_filter(
        &gray,
        params.no_background_mask_blur_kernel_x / 2,
        params.no_background_mask_blur_kernel_y / 2,
    );

    let (level, binary) = binarize_inverted(&blurred);
    tracing::debug!(
        "Otsu level {} (configured hint {})",
        level,
        params.no_background_mask_threshold
    );

    let mask = erode_rect(
        &binary,
        params.no_background_mask_erode_kernel_x,
        params.no_background_mask_erode_kernel_y,
    );

    BackgroundSuppression {
        gray,
        blurred,
        level,
        mask,
    }
}

/// Grayscale with BT.601 weights (0.299, 0.587, 0.114), rounded
pub fn luma_bt601(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
        Luma([((weighted + 500) / 1000) as u8])
    })
}

/// Dark pixels at or below the Otsu level become 255, the rest 0.
/// A single-valued histogram has nothing to split and yields an empty mask.
fn binarize_inverted(blurred: &GrayImage) -> (u8, GrayImage) {
    let (width, height) = blurred.dimensions();
    let mut values = blurred.pixels().map(|p| p.0[0]);
    let Some(first) = values.next() else {
        return (0, GrayImage::new(width, height));
    };
    if values.all(|v| v == first) {
        return (first, GrayImage::new(width, height));
    }

    let level = otsu_level(blurred);
    let mask = GrayImage::from_fn(width, height, |x, y| {
        if blurred.get_pixel(x, y).0[0] <= level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    (level, mask)
}

/// Binary erosion with a `kernel_x` x `kernel_y` rectangle anchored at its
/// center. Pixels outside the image do not erode the border.
pub fn erode_rect(mask: &GrayImage, kernel_x: u32, kernel_y: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    let (anchor_x, anchor_y) = (kernel_x / 2, kernel_y / 2);

    // Separable: horizontal pass, then vertical
    let horizontal = GrayImage::from_fn(width, height, |x, y| {
        let from = x.saturating_sub(anchor_x);
        let to = (x + kernel_x - anchor_x).min(width);
        let solid = (from..to).all(|sx| mask.get_pixel(sx, y).0[0] != 0);
        Luma([if solid { 255 } else { 0 }])
    });

    GrayImage::from_fn(width, height, |x, y| {
        let from = y.saturating_sub(anchor_y);
        let to = (y + kernel_y - anchor_y).min(height);
        let solid = (from..to).all(|sy| horizontal.get_pixel(x, sy).0[0] != 0);
        Luma([if solid { 255 } else { 0 }])
    })
}
