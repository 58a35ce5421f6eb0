//! Training set extraction from labeled captcha files
//!
//! Every image in the input directory is named after its answer
//! (e.g. `жхфш.png`). Files that segment into exactly one character per
//! label character contribute their crops, grouped by label.

use crate::classifier::{LabelsMap, INPUT_HEIGHT, INPUT_WIDTH, LABELS_MAP_FILE};
use crate::error::CaptchaError;
use crate::params::SegmentationParams;
use crate::segmentation::{OutputSize, Segmenter};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Counts reported after extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub files_seen: usize,
    pub files_used: usize,
    pub samples: usize,
    /// Distinct labels, sorted case-insensitively
    pub labels: Vec<String>,
}

/// Segment every labeled image in `input_dir` and write the character crops
/// to `output_dir/<label>/<stem>_<index>.png`, plus `labels_map.json`
pub fn extract_dataset(
    input_dir: &Path,
    output_dir: &Path,
    params: &SegmentationParams,
) -> Result<DatasetSummary, CaptchaError> {
    let files = list_images(input_dir)?;
    tracing::info!("Found {} dataset files", files.len());

    let segmenter = Segmenter::new(*params);
    let output = Some(OutputSize::new(INPUT_WIDTH, INPUT_HEIGHT));
    let mut summary = DatasetSummary {
        files_seen: files.len(),
        ..Default::default()
    };
    let mut labels = BTreeSet::new();

    for file in files {
        let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
            tracing::warn!("Skipping {}: file name is not valid UTF-8", file.display());
            continue;
        };
        let answer: Vec<char> = stem.chars().collect();

        let image = match image::open(&file) {
            Ok(image) => image.to_rgb8(),
            Err(e) => {
                tracing::error!("Unable to parse image {}: {}", file.display(), e);
                continue;
            }
        };

        let characters = match segmenter.segment(&image, output) {
            Ok(segmentation) => segmentation.characters,
            Err(e) => {
                tracing::error!("Unable to segment {}: {}", file.display(), e);
                continue;
            }
        };

        if characters.is_empty() {
            tracing::warn!("Unable to segment {}! No characters detected", file.display());
            continue;
        }
        if characters.len() != answer.len() {
            tracing::warn!(
                "Unable to segment {}! Found {} characters. Expected: {}",
                file.display(),
                characters.len(),
                answer.len()
            );
            continue;
        }

        for (index, (label, character)) in answer.iter().zip(&characters).enumerate() {
            let label_dir = output_dir.join(label.to_string());
            std::fs::create_dir_all(&label_dir)?;
            let path = label_dir.join(format!("{}_{}.png", stem, index));
            character.image.save(&path).map_err(|e| {
                CaptchaError::Internal(format!("Failed to write {}: {}", path.display(), e))
            })?;
            labels.insert(label.to_string());
            summary.samples += 1;
        }
        summary.files_used += 1;
    }

    let mut labels: Vec<String> = labels.into_iter().collect();
    labels.sort_by_key(|label| label.to_lowercase());
    summary.labels = labels;

    if summary.labels.is_empty() {
        tracing::warn!("No images for dataset");
    } else {
        std::fs::create_dir_all(output_dir)?;
        LabelsMap::new(summary.labels.clone()).save(&output_dir.join(LABELS_MAP_FILE))?;
    }

    tracing::info!(
        "Dataset contains {} images and {} unique labels from {} of {} files",
        summary.samples,
        summary.labels.len(),
        summary.files_used,
        summary.files_seen
    );
    Ok(summary)
}

/// Image files directly inside `dir`, sorted by name
fn list_images(dir: &Path) -> Result<Vec<PathBuf>, CaptchaError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
