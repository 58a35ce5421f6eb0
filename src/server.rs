use crate::config::Config;
use axum::{
    extract::{DefaultBodyLimit, State},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use captcha_segmenter::classifier::{Classifier, INPUT_HEIGHT, INPUT_WIDTH};
use captcha_segmenter::error::CaptchaError;
use captcha_segmenter::params::SegmentationParams;
use captcha_segmenter::segmentation::{OutputSize, Segmenter, StepTiming};
use image::{GrayImage, RgbImage};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub segmenter: Arc<Segmenter>,
    pub classifier: Option<Arc<dyn Classifier>>,
    pub config: Arc<Config>,
}

/// Segmentation response
#[derive(Serialize)]
pub struct SegmentResponse {
    pub count: usize,
    pub characters: Vec<CharacterInfo>,
    pub processing_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

#[derive(Serialize)]
pub struct CharacterInfo {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub foreground_pixels: u32,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Server info response
#[derive(Serialize)]
pub struct InfoResponse {
    pub version: String,
    pub classifier: Option<String>,
    pub labels: usize,
    pub input_width: u32,
    pub input_height: u32,
    pub max_body_size_bytes: usize,
    pub params: SegmentationParams,
}

/// Run the HTTP server
pub async fn run(config: Config, classifier: Option<Arc<dyn Classifier>>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let max_body_size = config.max_body_size;

    if let Some(dir) = &config.save_results {
        if !dir.exists() {
            tracing::info!("Creating {} directory", dir.display());
            std::fs::create_dir_all(dir)?;
        }
        tracing::info!("Directory for saving results: {}", dir.display());
    }
    if classifier.is_none() {
        tracing::warn!("No classifier loaded, only /segment will answer");
    }

    let state = AppState {
        segmenter: Arc::new(Segmenter::new(config.params)),
        classifier,
        config: Arc::new(config),
    };

    let app = Router::new()
        .route("/", post(handle_solve))
        .route("/segment", post(handle_segment))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any)),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Decode a base64 image body, optionally wrapped in a data URI
pub fn decode_image(body: &str) -> Result<RgbImage, CaptchaError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(CaptchaError::MissingImage);
    }

    let payload = match body.split_once(',') {
        Some((_, payload)) => payload,
        None => body,
    };
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| CaptchaError::InvalidImage(format!("Invalid base64: {}", e)))?;
    let image =
        image::load_from_memory(&bytes).map_err(|e| CaptchaError::InvalidImage(e.to_string()))?;

    Ok(image.to_rgb8())
}

/// Solve a captcha sent as base64 text
async fn handle_solve(State(state): State<AppState>, body: String) -> Result<String, CaptchaError> {
    let start = Instant::now();
    let image = decode_image(&body)?;
    let classifier = state
        .classifier
        .clone()
        .ok_or(CaptchaError::ClassifierUnavailable)?;

    let segmenter = state.segmenter.clone();
    let config = state.config.clone();
    let output = tokio::task::spawn_blocking(move || -> Result<String, CaptchaError> {
        let segmentation =
            segmenter.segment(&image, Some(OutputSize::new(INPUT_WIDTH, INPUT_HEIGHT)))?;
        let characters: Vec<GrayImage> = segmentation
            .characters
            .into_iter()
            .map(|c| c.image)
            .collect();
        let output = classifier.predict(&characters)?.concat();

        if let (Some(dir), false) = (&config.save_results, output.is_empty()) {
            let path = dir.join(format!("{}.png", output));
            tracing::info!("Saving as {}", path.display());
            if let Err(e) = image.save(&path) {
                tracing::error!("Failed to save {}: {}", path.display(), e);
            }
        }
        Ok(output)
    })
    .await
    .map_err(|e| CaptchaError::Internal(format!("Solver task failed: {}", e)))??;

    tracing::info!(
        "Solved: {} in {}ms",
        output,
        start.elapsed().as_millis() as u64
    );
    Ok(output)
}

/// Segment a captcha sent as base64 text without classifying it
async fn handle_segment(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<SegmentResponse>, CaptchaError> {
    let start = Instant::now();
    let image = decode_image(&body)?;

    let segmenter = state.segmenter.clone();
    let segmentation = tokio::task::spawn_blocking(move || segmenter.segment(&image, None))
        .await
        .map_err(|e| CaptchaError::Internal(format!("Segmentation task failed: {}", e)))??;

    let characters: Vec<CharacterInfo> = segmentation
        .characters
        .iter()
        .map(|c| CharacterInfo {
            x: c.rect.x,
            y: c.rect.y,
            width: c.rect.width,
            height: c.rect.height,
            foreground_pixels: c.foreground_pixels(),
        })
        .collect();

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Segmented {} characters in {}ms",
        characters.len(),
        processing_time_ms
    );

    Ok(Json(SegmentResponse {
        count: characters.len(),
        characters,
        processing_time_ms,
        steps: segmentation.steps,
    }))
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle info requests
async fn handle_info(State(state): State<AppState>) -> impl IntoResponse {
    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        classifier: state.classifier.as_ref().map(|c| c.name().to_string()),
        labels: state.classifier.as_ref().map_or(0, |c| c.labels().len()),
        input_width: INPUT_WIDTH,
        input_height: INPUT_HEIGHT,
        max_body_size_bytes: state.config.max_body_size,
        params: *state.segmenter.params(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_base64() -> String {
        let img = RgbImage::from_pixel(8, 6, Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_decode_plain_base64() {
        let image = decode_image(&png_base64()).unwrap();
        assert_eq!(image.dimensions(), (8, 6));
        assert_eq!(*image.get_pixel(0, 0), Rgb([10, 20, 30]));
    }

    #[test]
    fn test_decode_data_uri() {
        let body = format!("data:image/png;base64,{}\n", png_base64());
        assert_eq!(decode_image(&body).unwrap().dimensions(), (8, 6));
    }

    #[test]
    fn test_decode_rejects_empty_and_garbage() {
        assert!(matches!(decode_image("  \n"), Err(CaptchaError::MissingImage)));
        assert!(matches!(decode_image("!!!"), Err(CaptchaError::InvalidImage(_))));
        let not_an_image = general_purpose::STANDARD.encode(b"hello");
        assert!(matches!(decode_image(&not_an_image), Err(CaptchaError::InvalidImage(_))));
    }
}
