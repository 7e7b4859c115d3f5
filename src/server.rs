use crate::config::Config;
use crate::detector::Region;
use crate::error::{ErrorResponse, OcrError};
use crate::extractor::{ExtractionResult, Extractor};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<Extractor>,
    pub config: Arc<Config>,
}

/// Extraction response
#[derive(Serialize)]
pub struct ProcessImageResponse {
    pub success: bool,
    pub text: String,
    pub word_count: usize,
    pub words: Vec<Region>,
    pub processing_time_ms: u64,
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
    pub detector_loaded: bool,
    pub languages: Vec<String>,
    pub max_file_size_bytes: usize,
}

/// Build the HTTP router around an extractor
pub fn router(extractor: Arc<Extractor>, config: Config) -> Router {
    let max_file_size = config.max_file_size;
    let state = AppState {
        extractor,
        config: Arc::new(config),
    };

    Router::new()
        .route("/process-image", post(handle_process_image))
        .route("/health", get(handle_health))
        .route("/info", get(handle_info))
        .layer(DefaultBodyLimit::max(max_file_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let extractor = Arc::new(crate::build_extractor(&config));
    let addr = format!("{}:{}", config.host, config.port);

    let app = router(extractor, config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Handle image upload and extraction
async fn handle_process_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, OcrError> {
    let start = Instant::now();

    let mut file_data: Option<Bytes> = None;
    let mut content_type: Option<String> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| OcrError::InvalidRequest(format!("Failed to parse multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "file" => {
                content_type = field.content_type().map(|s| s.to_string());
                file_name = field.file_name().map(|s| s.to_string());
                file_data = Some(field.bytes().await.map_err(|e| {
                    OcrError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?);
            }
            "languages" => {
                // Language is fixed per process because the detector is cached
                let requested = field.text().await.map_err(|e| {
                    OcrError::InvalidRequest(format!("Invalid languages: {}", e))
                })?;
                tracing::debug!("Ignoring per-request languages: {}", requested);
            }
            _ => {}
        }
    }

    let data = file_data.ok_or(OcrError::MissingFile)?;

    if data.len() > state.config.max_file_size {
        return Err(OcrError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    let mime = content_type.unwrap_or_else(|| "application/octet-stream".to_string());
    if !mime.starts_with("image/") {
        return Err(OcrError::InvalidRequest(
            "File must be an image".to_string(),
        ));
    }

    let extension = match mime.as_str() {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        "image/webp" => ".webp",
        "image/tiff" => ".tiff",
        _ => ".img",
    };

    // Keep the upload name so the debug artifact is recognizable
    let prefix = file_name
        .as_deref()
        .and_then(|n| std::path::Path::new(n).file_stem())
        .map(|s| format!("{}-", s.to_string_lossy()))
        .unwrap_or_else(|| "upload-".to_string());

    let mut temp_file = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(extension)
        .tempfile()
        .map_err(|e| OcrError::Internal(format!("Failed to create temp file: {}", e)))?;

    temp_file
        .write_all(&data)
        .map_err(|e| OcrError::Internal(format!("Failed to write temp file: {}", e)))?;

    let extractor = state.extractor.clone();
    let result = tokio::task::spawn_blocking(move || {
        let result = extractor.extract_text(temp_file.path(), true);
        drop(temp_file);
        result
    })
    .await
    .map_err(|e| OcrError::Internal(format!("Extraction task failed: {}", e)))?;

    let processing_time_ms = start.elapsed().as_millis() as u64;

    match result {
        ExtractionResult::Success(transcript) => {
            tracing::info!(
                "Extraction completed in {}ms, {} regions, text length: {}",
                processing_time_ms,
                transcript.regions.len(),
                transcript.full_text.len()
            );
            Ok(Json(ProcessImageResponse {
                success: true,
                word_count: transcript.regions.len(),
                text: transcript.full_text,
                words: transcript.regions,
                processing_time_ms,
            })
            .into_response())
        }
        ExtractionResult::Failure { kind, message } => {
            let body = Json(ErrorResponse {
                error: message,
                code: kind.as_str().to_string(),
            });
            Ok((StatusCode::INTERNAL_SERVER_ERROR, body).into_response())
        }
    }
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
        detector_loaded: state.extractor.detector().is_loaded(),
        languages: state.extractor.detector_config().languages.clone(),
        max_file_size_bytes: state.config.max_file_size,
    })
}
