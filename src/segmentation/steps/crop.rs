use crate::segmentation::{Character, OutputSize, Rect};
use image::{imageops, GrayImage};

/// Cut one character per rectangle out of the refined mask, left to right.
///
/// Rectangles are clamped to the mask bounds first; one that ends up empty
/// is skipped.
pub fn crop_characters(
    mask: &GrayImage,
    rects: &[Rect],
    output: Option<OutputSize>,
) -> Vec<Character> {
    let mut ordered = rects.to_vec();
    ordered.sort_by_key(|r| (r.x, r.y));

    ordered
        .into_iter()
        .filter_map(|rect| {
            let Some(rect) = clamp(rect, mask.width(), mask.height()) else {
                tracing::debug!("Skipping rectangle outside the image: {:?}", rect);
                return None;
            };
            let crop = imageops::crop_imm(mask, rect.x, rect.y, rect.width, rect.height).to_image();
            let image = match output {
                Some(size) => resample_nearest(&crop, size),
                None => crop,
            };
            Some(Character { image, rect })
        })
        .collect()
}

fn clamp(rect: Rect, width: u32, height: u32) -> Option<Rect> {
    let x = rect.x.min(width);
    let y = rect.y.min(height);
    let right = rect.right().min(width);
    let bottom = rect.bottom().min(height);
    if right <= x || bottom <= y {
        return None;
    }
    Some(Rect::new(x, y, right - x, bottom - y))
}

/// Nearest-neighbor resampling: every output pixel copies exactly one source
/// pixel, so a 0/255 mask stays 0/255
pub fn resample_nearest(image: &GrayImage, size: OutputSize) -> GrayImage {
    let (src_w, src_h) = image.dimensions();
    let scale_x = src_w as f64 / size.width as f64;
    let scale_y = src_h as f64 / size.height as f64;

    GrayImage::from_fn(size.width, size.height, |x, y| {
        let sx = ((x as f64 * scale_x).floor() as u32).min(src_w - 1);
        let sy = ((y as f64 * scale_y).floor() as u32).min(src_h - 1);
        *image.get_pixel(sx, sy)
    })
}
