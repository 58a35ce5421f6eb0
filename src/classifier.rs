use crate::error::CaptchaError;
use image::GrayImage;
use std::path::Path;

/// Character image width expected by the classifier
pub const INPUT_WIDTH: u32 = 64;
/// Character image height expected by the classifier
pub const INPUT_HEIGHT: u32 = 64;

/// File holding the label vocabulary next to the model
pub const LABELS_MAP_FILE: &str = "labels_map.json";

/// Trait that all character classifiers must implement
pub trait Classifier: Send + Sync {
    /// Returns the classifier identifier (e.g., "rten")
    fn name(&self) -> &'static str;

    /// Label vocabulary, indexed by class
    fn labels(&self) -> &LabelsMap;

    /// Predict one label per `INPUT_WIDTH` x `INPUT_HEIGHT` character mask
    /// (0-255, black background)
    fn predict(&self, characters: &[GrayImage]) -> Result<Vec<String>, CaptchaError>;
}

/// Ordered label vocabulary, stored as a JSON array of strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelsMap {
    labels: Vec<String>,
}

impl LabelsMap {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn load(path: &Path) -> Result<Self, CaptchaError> {
        tracing::info!("Loading labels map from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        let labels: Vec<String> = serde_json::from_str(&text).map_err(|e| {
            CaptchaError::Classifier(format!("Invalid labels map {}: {}", path.display(), e))
        })?;
        Ok(Self { labels })
    }

    pub fn save(&self, path: &Path) -> Result<(), CaptchaError> {
        tracing::info!("Saving labels map to {}", path.display());
        let text = serde_json::to_string_pretty(&self.labels)
            .map_err(|e| CaptchaError::Internal(format!("Failed to encode labels map: {}", e)))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label of the highest score
    pub fn argmax(&self, scores: &[f32]) -> Option<&str> {
        scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .and_then(|(index, _)| self.get(index))
    }
}

/// Scale a 0-255 mask to `[0, 1]`, row-major
pub fn normalize(image: &GrayImage) -> Vec<f32> {
    image.pixels().map(|p| p.0[0] as f32 / 255.0).collect()
}
