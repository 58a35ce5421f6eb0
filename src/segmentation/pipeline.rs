use crate::error::CaptchaError;
use crate::observer::SegmentationObserver;
use crate::params::SegmentationParams;
use image::{GrayImage, RgbImage};
use imageproc::region_labelling::Connectivity;
use serde::Serialize;
use std::time::Instant;

use super::steps::{aggregate, background, cluster, compositor, crop, filter, refine, scan};
use super::{Character, OutputSize};

/// Timing information for a single segmentation stage
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Result of segmenting one image
#[derive(Debug, Clone, Serialize)]
pub struct Segmentation {
    /// Characters ordered left to right (not serialized)
    #[serde(skip)]
    pub characters: Vec<Character>,
    /// Total segmentation time in milliseconds
    pub total_time_ms: u64,
    /// Individual stage timings
    pub steps: Vec<StepTiming>,
}

/// Segmentation pipeline with a resolved parameter set
#[derive(Debug, Clone)]
pub struct Segmenter {
    params: SegmentationParams,
    connectivity: Connectivity,
}

impl Segmenter {
    pub fn new(params: SegmentationParams) -> Self {
        Self {
            params,
            connectivity: Connectivity::Four,
        }
    }

    /// Grow regions with 8-connectivity instead of the default 4
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn params(&self) -> &SegmentationParams {
        &self.params
    }

    pub fn segment(
        &self,
        image: &RgbImage,
        output: Option<OutputSize>,
    ) -> Result<Segmentation, CaptchaError> {
        self.segment_observed(image, output, &mut ())
    }

    /// Segment `image`, reporting intermediate artifacts to `observer`
    pub fn segment_observed(
        &self,
        image: &RgbImage,
        output: Option<OutputSize>,
        observer: &mut dyn SegmentationObserver,
    ) -> Result<Segmentation, CaptchaError> {
        let start = Instant::now();
        let mut timings = Vec::new();
        let params = &self.params;
        let (width, height) = image.dimensions();

        params.validate()?;
        if let Some(size) = output {
            check_output_size(size, width, height)?;
        }

        tracing::info!("Segmenting image {}x{}", width, height);

        let suppression = self.run_step("background", &mut timings, || {
            background::suppress(image, params)
        });
        let composited = self.run_step("composite", &mut timings, || {
            compositor::apply(image, &suppression.mask)
        });
        observer.on_foreground(image, &suppression, &composited);

        let candidates = self.run_step("scan", &mut timings, || {
            scan::scan(
                &composited,
                &suppression.mask,
                params.floodfill_threshold,
                self.connectivity,
            )
        });

        let verdicts: Vec<filter::Verdict> = self.run_step("filter", &mut timings, || {
            candidates.iter().map(|c| filter::evaluate(c, params)).collect()
        });
        for (candidate, verdict) in candidates.iter().zip(&verdicts) {
            observer.on_candidate(&composited, candidate, verdict);
        }

        let accepted: Vec<scan::Candidate> = candidates
            .into_iter()
            .zip(&verdicts)
            .filter(|(_, verdict)| verdict.is_accepted())
            .map(|(candidate, _)| candidate)
            .collect();
        tracing::debug!(
            "{} of {} seeded regions passed filtering",
            accepted.len(),
            verdicts.len()
        );

        if accepted.is_empty() {
            tracing::info!("Found 0 characters");
            return Ok(Segmentation {
                characters: Vec::new(),
                total_time_ms: start.elapsed().as_millis() as u64,
                steps: timings,
            });
        }

        let characters_mask = self.run_step("aggregate", &mut timings, || {
            aggregate::aggregate(&accepted, width, height)
        });

        let rects: Vec<_> = accepted.iter().map(|c| c.rect).collect();
        let grouped = self.run_step("cluster", &mut timings, || {
            cluster::group_rectangles(&rects, params.rects_group_threshold, params.group_eps())
        });

        let refined = self.run_step("refine", &mut timings, || refine::apply(&characters_mask));
        observer.on_clusters(&refined, &grouped);

        let characters = self.run_step("crop", &mut timings, || {
            crop::crop_characters(&refined, &grouped, output)
        });
        observer.on_characters(&characters);

        for timing in &timings {
            tracing::debug!("Step {} took {}ms", timing.name, timing.time_ms);
        }
        tracing::info!("Found {} characters", characters.len());

        Ok(Segmentation {
            characters,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
        })
    }

    fn run_step<T, F>(&self, name: &str, timings: &mut Vec<StepTiming>, step_fn: F) -> T
    where
        F: FnOnce() -> T,
    {
        let step_start = Instant::now();
        let result = step_fn();
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms: step_start.elapsed().as_millis() as u64,
        });
        result
    }
}

fn check_output_size(size: OutputSize, width: u32, height: u32) -> Result<(), CaptchaError> {
    if size.width == 0 || size.width > width {
        return Err(CaptchaError::InvalidOutputSize {
            dimension: "width",
            requested: size.width,
            available: width,
        });
    }
    if size.height == 0 || size.height > height {
        return Err(CaptchaError::InvalidOutputSize {
            dimension: "height",
            requested: size.height,
            available: height,
        });
    }
    Ok(())
}

/// Segment a captcha into binary character masks, left to right.
///
/// Fails only when the requested output size exceeds the image. An image
/// where nothing passes filtering yields an empty list.
pub fn segment(
    image: &RgbImage,
    output: Option<OutputSize>,
    params: &SegmentationParams,
) -> Result<Vec<GrayImage>, CaptchaError> {
    let segmentation = Segmenter::new(*params).segment(image, output)?;
    Ok(segmentation
        .characters
        .into_iter()
        .map(|c| c.image)
        .collect())
}
