//! Captcha character segmentation.
//!
//! A captcha image is reduced to a foreground mask, scanned along its middle
//! row with seeded flood fills, filtered, clustered into character boxes and
//! cropped into one binary mask per character, left to right. A pluggable
//! [`classifier::Classifier`] turns those masks into an answer.

pub mod classifier;
pub mod dataset;
pub mod engines;
pub mod error;
pub mod observer;
pub mod params;
pub mod segmentation;

pub use error::CaptchaError;
pub use params::SegmentationParams;
pub use segmentation::{segment, OutputSize, Segmenter};
