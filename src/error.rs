use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptchaError {
    #[error("Output {dimension} must be between 1 and the image {dimension} ({available}), got {requested}")]
    InvalidOutputSize {
        dimension: &'static str,
        requested: u32,
        available: u32,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing image in request")]
    MissingImage,

    #[error("Failed to decode image: {0}")]
    InvalidImage(String),

    #[error("No classifier loaded")]
    ClassifierUnavailable,

    #[error("Classifier failed: {0}")]
    Classifier(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for CaptchaError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            CaptchaError::InvalidOutputSize { .. } => {
                (StatusCode::BAD_REQUEST, "INVALID_OUTPUT_SIZE")
            }
            CaptchaError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "INVALID_PARAMETER"),
            CaptchaError::MissingImage => (StatusCode::BAD_REQUEST, "MISSING_IMAGE"),
            CaptchaError::InvalidImage(_) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE"),
            CaptchaError::ClassifierUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "CLASSIFIER_UNAVAILABLE")
            }
            CaptchaError::Classifier(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CLASSIFIER_ERROR"),
            CaptchaError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            CaptchaError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
