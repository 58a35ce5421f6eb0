//! Classifier implementations
//!
//! Backends are conditionally compiled based on feature flags. Without any
//! backend the server still segments but cannot solve.

#[cfg(feature = "classifier-rten")]
pub mod rten;

use crate::classifier::Classifier;
use crate::error::CaptchaError;
use std::path::Path;
use std::sync::Arc;

/// Load the classifier stored in `model_dir` with the compiled-in backend
pub fn load(model_dir: &Path) -> Result<Arc<dyn Classifier>, CaptchaError> {
    #[cfg(feature = "classifier-rten")]
    {
        tracing::info!("Initializing rten classifier...");
        let classifier = self::rten::RtenClassifier::new(model_dir)?;
        Ok(Arc::new(classifier))
    }

    #[cfg(not(feature = "classifier-rten"))]
    {
        tracing::warn!(
            "Cannot load model from {}: built without a classifier backend (enable --features classifier-rten)",
            model_dir.display()
        );
        Err(CaptchaError::ClassifierUnavailable)
    }
}
