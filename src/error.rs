use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Model not loaded. Please check server logs.")]
    ModelUnavailable,
    #[error("Translation Error: {0}")]
    Translation(String),
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
    #[error("model execution failed: {0}")]
    Inference(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match self {
            ServiceError::Config(_) => StatusCode::BAD_REQUEST,
            ServiceError::ModelUnavailable
            | ServiceError::Translation(_)
            | ServiceError::Tokenizer(_)
            | ServiceError::Inference(_)
            | ServiceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "detail": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Why the model could not be brought up at startup (or on reload).
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("model path '{}' not found", .0.display())]
    MissingArtifact(PathBuf),
    #[error("failed to load tokenizer: {0}")]
    Tokenizer(String),
    #[error("failed to load model on {device}: {reason}")]
    Device { device: String, reason: String },
    #[error("failed to load model with device='{primary_device}' ({primary}) and device='cpu' ({fallback})")]
    AllDevicesFailed {
        primary_device: String,
        primary: String,
        fallback: String,
    },
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("converter exited with {0}")]
    Failed(std::process::ExitStatus),
    #[error("conversion produced no model file at {}", .0.display())]
    MissingArtifact(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
