use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Image not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Could not read image: {0}")]
    ImageRead(String),

    #[error("Preprocessing failed: {0}")]
    PreprocessingError(String),

    #[error("Text detection failed: {0}")]
    DetectionFailure(String),

    #[error("Failed to initialize text detector: {0}")]
    InitializationError(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure category carried by a failed extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    FileNotFound,
    ImageRead,
    DetectionFailure,
    Initialization,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FileNotFound => "FILE_NOT_FOUND",
            Self::ImageRead => "IMAGE_READ_ERROR",
            Self::DetectionFailure => "DETECTION_FAILURE",
            Self::Initialization => "INIT_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl OcrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrError::FileNotFound(_) => ErrorKind::FileNotFound,
            OcrError::ImageRead(_) | OcrError::PreprocessingError(_) => ErrorKind::ImageRead,
            OcrError::DetectionFailure(_) => ErrorKind::DetectionFailure,
            OcrError::InitializationError(_) => ErrorKind::Initialization,
            _ => ErrorKind::Internal,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            OcrError::FileNotFound(_) => (StatusCode::NOT_FOUND, "FILE_NOT_FOUND"),
            OcrError::ImageRead(_) => (StatusCode::UNPROCESSABLE_ENTITY, "IMAGE_READ_ERROR"),
            OcrError::PreprocessingError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PREPROCESSING_ERROR")
            }
            OcrError::DetectionFailure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DETECTION_FAILURE")
            }
            OcrError::InitializationError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR"),
            OcrError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            OcrError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            OcrError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            OcrError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
