#![allow(dead_code)]

use image::{Rgb, RgbImage};

pub const BACKGROUND: Rgb<u8> = Rgb([230, 230, 230]);
pub const INK: Rgb<u8> = Rgb([40, 40, 40]);

/// 200x80 light captcha with `glyphs` dark 40x50 blocks starting at
/// x = 10, 58, 106, 154 and spanning rows 15..65
pub fn blocks_captcha(glyphs: u32) -> RgbImage {
    let mut img = RgbImage::from_pixel(200, 80, BACKGROUND);
    for i in 0..glyphs {
        let left = 10 + i * 48;
        for y in 15..65 {
            for x in left..left + 40 {
                img.put_pixel(x, y, INK);
            }
        }
    }
    img
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    bytes
}
