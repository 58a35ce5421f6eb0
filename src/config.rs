use crate::{ParamArgs, ServeArgs};
use captcha_segmenter::error::CaptchaError;
use captcha_segmenter::params::SegmentationParams;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,
    pub save_results: Option<PathBuf>,
    pub params: SegmentationParams,
}

impl TryFrom<ServeArgs> for Config {
    type Error = CaptchaError;

    fn try_from(args: ServeArgs) -> Result<Self, Self::Error> {
        Ok(Self {
            host: args.host,
            port: args.port,
            max_body_size: args.max_body_size,
            save_results: args.save_results,
            params: args.params.resolve()?,
        })
    }
}

impl ParamArgs {
    /// Defaults, then the parameter file if any, then KEY=VALUE overrides
    pub fn resolve(&self) -> Result<SegmentationParams, CaptchaError> {
        let mut params = match &self.params_file {
            Some(path) => {
                tracing::info!("Loading segmentation parameters from {}", path.display());
                SegmentationParams::from_file(path)?
            }
            None => SegmentationParams::default(),
        };

        for (key, value) in &self.params {
            if !params.apply(key, *value)? {
                tracing::warn!("Ignoring unknown segmentation parameter: {}", key);
            }
        }
        params.validate()?;

        tracing::info!("Provided segmentation parameters: {:?}", self.params);
        Ok(params)
    }
}
