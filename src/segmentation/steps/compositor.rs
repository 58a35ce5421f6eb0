use image::{GrayImage, Rgb, RgbImage};

/// Zero every pixel of `image` that lies outside the foreground `mask`
pub fn apply(image: &RgbImage, mask: &GrayImage) -> RgbImage {
    let (width, height) = image.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y).0[0] != 0 {
            *image.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}
