//! Segmentation parameter set
//!
//! A fixed vocabulary of integer parameters. Missing keys always resolve to
//! the defaults below; known keys override them.

use crate::error::CaptchaError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable thresholds for every segmentation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationParams {
    pub no_background_mask_blur_kernel_x: u32,
    pub no_background_mask_blur_kernel_y: u32,
    /// Binarization hint. Otsu picks the actual cut.
    pub no_background_mask_threshold: u32,
    pub no_background_mask_erode_kernel_x: u32,
    pub no_background_mask_erode_kernel_y: u32,
    /// Per-channel flood fill tolerance around the seed color
    pub floodfill_threshold: u32,
    /// Reserved. The clusterer reads `rects_group_threshold`.
    pub group_threshold: u32,
    pub min_character_width: u32,
    pub max_character_width: u32,
    pub min_character_height: u32,
    pub max_character_height: u32,
    /// Minimum foreground coverage of a candidate's box, in percent
    pub min_pixel_density: u32,
    pub rects_group_threshold: u32,
    /// Clustering epsilon, in percent
    pub rects_group_eps: u32,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            no_background_mask_blur_kernel_x: 3,
            no_background_mask_blur_kernel_y: 3,
            no_background_mask_threshold: 180,
            no_background_mask_erode_kernel_x: 3,
            no_background_mask_erode_kernel_y: 2,
            floodfill_threshold: 39,
            group_threshold: 2,
            min_character_width: 34,
            max_character_width: 110,
            min_character_height: 34,
            max_character_height: 110,
            min_pixel_density: 12,
            rects_group_threshold: 2,
            rects_group_eps: 45,
        }
    }
}

impl SegmentationParams {
    /// Merge `(key, value)` overrides on top of the defaults.
    ///
    /// Unknown keys are ignored with a warning, since the same key=value list
    /// may carry settings for other tools.
    pub fn with_overrides<I, K>(overrides: I) -> Result<Self, CaptchaError>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: AsRef<str>,
    {
        let mut params = Self::default();
        for (key, value) in overrides {
            let key = key.as_ref();
            if !params.apply(key, value)? {
                tracing::warn!("Ignoring unknown segmentation parameter: {}", key);
            }
        }
        params.validate()?;
        Ok(params)
    }

    /// Set one parameter by name. Returns `false` if the key is not part of
    /// the vocabulary.
    pub fn apply(&mut self, key: &str, value: i64) -> Result<bool, CaptchaError> {
        let Some(slot) = self.slot_mut(key) else {
            return Ok(false);
        };
        *slot = u32::try_from(value).map_err(|_| {
            CaptchaError::InvalidParameter(format!(
                "{} must be a non-negative integer, got {}",
                key, value
            ))
        })?;

        if key == "group_threshold" && self.group_threshold != Self::default().group_threshold {
            tracing::warn!(
                "group_threshold is reserved and not used for grouping; set rects_group_threshold instead"
            );
        }
        Ok(true)
    }

    pub fn get(&self, key: &str) -> Option<u32> {
        self.entries()
            .into_iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value)
    }

    /// All parameters in canonical key order
    pub fn entries(&self) -> [(&'static str, u32); 14] {
        [
            ("no_background_mask_blur_kernel_x", self.no_background_mask_blur_kernel_x),
            ("no_background_mask_blur_kernel_y", self.no_background_mask_blur_kernel_y),
            ("no_background_mask_threshold", self.no_background_mask_threshold),
            ("no_background_mask_erode_kernel_x", self.no_background_mask_erode_kernel_x),
            ("no_background_mask_erode_kernel_y", self.no_background_mask_erode_kernel_y),
            ("floodfill_threshold", self.floodfill_threshold),
            ("group_threshold", self.group_threshold),
            ("min_character_width", self.min_character_width),
            ("max_character_width", self.max_character_width),
            ("min_character_height", self.min_character_height),
            ("max_character_height", self.max_character_height),
            ("min_pixel_density", self.min_pixel_density),
            ("rects_group_threshold", self.rects_group_threshold),
            ("rects_group_eps", self.rects_group_eps),
        ]
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut u32> {
        let slot = match key {
            "no_background_mask_blur_kernel_x" => &mut self.no_background_mask_blur_kernel_x,
            "no_background_mask_blur_kernel_y" => &mut self.no_background_mask_blur_kernel_y,
            "no_background_mask_threshold" => &mut self.no_background_mask_threshold,
            "no_background_mask_erode_kernel_x" => &mut self.no_background_mask_erode_kernel_x,
            "no_background_mask_erode_kernel_y" => &mut self.no_background_mask_erode_kernel_y,
            "floodfill_threshold" => &mut self.floodfill_threshold,
            "group_threshold" => &mut self.group_threshold,
            "min_character_width" => &mut self.min_character_width,
            "max_character_width" => &mut self.max_character_width,
            "min_character_height" => &mut self.min_character_height,
            "max_character_height" => &mut self.max_character_height,
            "min_pixel_density" => &mut self.min_pixel_density,
            "rects_group_threshold" => &mut self.rects_group_threshold,
            "rects_group_eps" => &mut self.rects_group_eps,
            _ => return None,
        };
        Some(slot)
    }

    /// Load a JSON object of parameters. Missing keys take their defaults,
    /// unknown keys are ignored.
    pub fn from_file(path: &Path) -> Result<Self, CaptchaError> {
        let text = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&text).map_err(|e| {
            CaptchaError::InvalidParameter(format!("{}: {}", path.display(), e))
        })?;
        params.validate()?;
        Ok(params)
    }

    /// Kernel sizes must be at least 1
    pub fn validate(&self) -> Result<(), CaptchaError> {
        let kernels = [
            ("no_background_mask_blur_kernel_x", self.no_background_mask_blur_kernel_x),
            ("no_background_mask_blur_kernel_y", self.no_background_mask_blur_kernel_y),
            ("no_background_mask_erode_kernel_x", self.no_background_mask_erode_kernel_x),
            ("no_background_mask_erode_kernel_y", self.no_background_mask_erode_kernel_y),
        ];
        for (name, size) in kernels {
            if size == 0 {
                return Err(CaptchaError::InvalidParameter(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }

    /// `rects_group_eps` as a fraction
    pub fn group_eps(&self) -> f64 {
        self.rects_group_eps as f64 / 100.0
    }
}

/// Parse a `key=value` assignment as given on the command line
pub fn parse_assignment(text: &str) -> Result<(String, i64), CaptchaError> {
    let (key, value) = text.split_once('=').ok_or_else(|| {
        CaptchaError::InvalidParameter(format!("expected KEY=VALUE, got {:?}", text))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CaptchaError::InvalidParameter(format!("empty key in {:?}", text)));
    }
    let value = value.trim().parse::<i64>().map_err(|e| {
        CaptchaError::InvalidParameter(format!(
            "{}: value {:?} is not an integer: {}",
            key,
            value.trim(),
            e
        ))
    })?;
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_table() {
        let params = SegmentationParams::default();
        assert_eq!(params.get("floodfill_threshold"), Some(39));
        assert_eq!(params.get("no_background_mask_erode_kernel_y"), Some(2));
        assert_eq!(params.get("rects_group_eps"), Some(45));
        assert_eq!(params.entries().len(), 14);
        assert!((params.group_eps() - 0.45).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overrides_replace_only_known_keys() {
        let params = SegmentationParams::with_overrides([
            ("min_pixel_density", 30),
            ("training_epochs", 50),
        ])
        .unwrap();

        assert_eq!(params.min_pixel_density, 30);
        assert_eq!(params.get("training_epochs"), None);
        assert_eq!(params.max_character_width, 110);
    }

    #[test]
    fn test_group_threshold_stays_distinct() {
        let params = SegmentationParams::with_overrides([("group_threshold", 7)]).unwrap();
        assert_eq!(params.group_threshold, 7);
        assert_eq!(params.rects_group_threshold, 2);
    }

    #[test]
    fn test_negative_value_is_rejected() {
        let result = SegmentationParams::with_overrides([("floodfill_threshold", -1)]);
        assert!(matches!(result, Err(CaptchaError::InvalidParameter(_))));
    }

    #[test]
    fn test_zero_kernel_is_rejected() {
        let result = SegmentationParams::with_overrides([("no_background_mask_blur_kernel_x", 0)]);
        assert!(matches!(result, Err(CaptchaError::InvalidParameter(_))));
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment(" min_character_width = 20 ").unwrap(),
            ("min_character_width".to_string(), 20)
        );
        assert!(parse_assignment("min_character_width").is_err());
        assert!(parse_assignment("min_character_width=abc").is_err());
        assert!(parse_assignment("=5").is_err());
    }

    #[test]
    fn test_json_fills_missing_keys_from_defaults() {
        let params: SegmentationParams =
            serde_json::from_str(r#"{"floodfill_threshold": 20, "unknown": 1}"#).unwrap();
        assert_eq!(params.floodfill_threshold, 20);
        assert_eq!(params.min_character_height, 34);
    }
}
