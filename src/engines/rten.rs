//! rten classifier implementation
//!
//! Pure Rust inference, no system dependencies. The model directory holds
//! `model.rten` and `labels_map.json`. The model takes an NHWC batch
//! `[N, 64, 64, 1]` in `[0, 1]` and returns one score row per image.

use crate::classifier::{
    normalize, Classifier, LabelsMap, INPUT_HEIGHT, INPUT_WIDTH, LABELS_MAP_FILE,
};
use crate::error::CaptchaError;
use image::GrayImage;
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::NdTensor;
use std::path::Path;

pub const MODEL_FILE: &str = "model.rten";

/// Character classifier wrapping an rten model
pub struct RtenClassifier {
    model: Model,
    labels: LabelsMap,
}

impl RtenClassifier {
    pub fn new(model_dir: &Path) -> Result<Self, CaptchaError> {
        let labels = LabelsMap::load(&model_dir.join(LABELS_MAP_FILE))?;

        let model_path = model_dir.join(MODEL_FILE);
        tracing::info!("Loading model from {}", model_path.display());
        let model = Model::load_file(&model_path).map_err(|e| {
            CaptchaError::Classifier(format!("Failed to load model: {}", e))
        })?;

        tracing::info!("rten classifier initialized with {} labels", labels.len());
        Ok(Self { model, labels })
    }
}

impl Classifier for RtenClassifier {
    fn name(&self) -> &'static str {
        "rten"
    }

    fn labels(&self) -> &LabelsMap {
        &self.labels
    }

    fn predict(&self, characters: &[GrayImage]) -> Result<Vec<String>, CaptchaError> {
        if characters.is_empty() {
            return Ok(Vec::new());
        }

        let pixels = (INPUT_WIDTH * INPUT_HEIGHT) as usize;
        let mut data = Vec::with_capacity(characters.len() * pixels);
        for character in characters {
            if character.dimensions() != (INPUT_WIDTH, INPUT_HEIGHT) {
                return Err(CaptchaError::Classifier(format!(
                    "Expected {}x{} character, got {}x{}",
                    INPUT_WIDTH,
                    INPUT_HEIGHT,
                    character.width(),
                    character.height()
                )));
            }
            data.extend(normalize(character));
        }

        let input = NdTensor::from_data(
            [characters.len(), INPUT_HEIGHT as usize, INPUT_WIDTH as usize, 1],
            data,
        );
        let output = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| CaptchaError::Classifier(format!("Inference failed: {}", e)))?;
        let scores: NdTensor<f32, 2> = output
            .try_into()
            .map_err(|e| CaptchaError::Classifier(format!("Unexpected model output: {:?}", e)))?;

        let classes = scores.size(1);
        if classes == 0 {
            return Err(CaptchaError::Classifier("Model returned no classes".to_string()));
        }

        scores
            .to_vec()
            .chunks(classes)
            .map(|row| {
                self.labels.argmax(row).map(str::to_string).ok_or_else(|| {
                    CaptchaError::Classifier(format!(
                        "Model has {} classes but labels map only {}",
                        classes,
                        self.labels.len()
                    ))
                })
            })
            .collect()
    }
}
