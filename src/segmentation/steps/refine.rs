use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};

/// Close small gaps in the aggregate mask: one 3x3 dilation followed by one
/// 3x3 erosion
pub fn apply(mask: &GrayImage) -> GrayImage {
    erode(&dilate(mask, Norm::LInf, 1), Norm::LInf, 1)
}
