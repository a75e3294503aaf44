use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    error::ServiceError,
    model::{ModelMetadata, ModelRegistry, TranslationRequest, TranslationResponse},
};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
}

pub fn build_router(registry: Arc<ModelRegistry>) -> Router {
    let state = AppState { registry };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/translate", get(translate_get).post(translate))
        .route("/metadata", get(metadata))
        .route("/reload", post(reload))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "NLLB Translation Server is running. Use POST /translate to translate text.",
    }))
}

async fn health() -> &'static str {
    "ok"
}

async fn translate_get() -> Json<Value> {
    Json(json!({
        "status": "error",
        "message": "This endpoint requires a POST request via JSON. Please use the application or a tool like Postman.",
    }))
}

async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslationRequest>,
) -> Result<Json<TranslationResponse>, ServiceError> {
    let response = state.registry.translate(request).await?;
    Ok(Json(response))
}

async fn metadata(State(state): State<AppState>) -> Json<ModelMetadata> {
    Json(state.registry.metadata())
}

async fn reload(State(state): State<AppState>) -> Result<Json<ModelMetadata>, ServiceError> {
    info!("reloading model");
    let metadata = state.registry.reload().await?;
    Ok(Json(metadata))
}
