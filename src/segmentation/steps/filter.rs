use super::scan::Candidate;
use crate::params::SegmentationParams;

/// Outcome of checking one candidate region
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accepted { density: f64 },
    /// Bounding box outside the configured width/height range
    RejectedSize,
    /// No foreground pixel left after intersecting with the mask
    RejectedEmpty,
    RejectedDensity { density: f64 },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }
}

/// Accept or reject a candidate by box size, then by foreground density
/// (percent of the box covered by the intersected mask)
pub fn evaluate(candidate: &Candidate, params: &SegmentationParams) -> Verdict {
    let rect = candidate.rect;
    let width_ok =
        (params.min_character_width..=params.max_character_width).contains(&rect.width);
    let height_ok =
        (params.min_character_height..=params.max_character_height).contains(&rect.height);
    if !width_ok || !height_ok {
        return Verdict::RejectedSize;
    }

    let pixels = candidate.foreground_pixels();
    if pixels == 0 {
        return Verdict::RejectedEmpty;
    }

    let density = 100.0 * pixels as f64 / rect.area() as f64;
    if density < params.min_pixel_density as f64 {
        return Verdict::RejectedDensity { density };
    }

    Verdict::Accepted { density }
}
