//! HTTP surface: liveness, readiness, metrics and the predict endpoint.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use neuroscan_core::{metrics_handler, ServerSettings};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, instrument, warn};

use crate::error::ApiError;
use crate::inference::Prediction;
use crate::loader::{ModelPhase, ModelSlot};
use crate::metrics::{self, INFERENCE_LATENCY_MS};
use crate::preprocess;

/// Multipart field carrying the uploaded scan.
pub const IMAGE_FIELD: &str = "image";

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<ModelSlot>,
}

impl AppState {
    pub fn new(model: Arc<ModelSlot>) -> Self { Self { model } }
}

pub fn router(state: AppState, server: &ServerSettings) -> Router {
    metrics::register();
    Router::new()
        .route("/", get(root))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics_handler))
        .route("/api/predict", post(predict))
        .layer(DefaultBodyLimit::max(server.body_limit_bytes))
        .layer(cors_layer(server))
        .with_state(state)
}

fn cors_layer(server: &ServerSettings) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if server.allows_any_origin() {
        return layer.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = server
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn root() -> Json<Value> { Json(json!({ "message": "API is live" })) }

#[derive(Serialize)]
struct Readiness {
    ready: bool,
    state: ModelPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let phase = state.model.phase();
    let status = if phase == ModelPhase::Ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(Readiness { ready: phase == ModelPhase::Ready, state: phase, detail: state.model.failure() }))
}

#[instrument(skip_all)]
async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let outcome = run_prediction(&state, multipart).await;
    metrics::record_outcome(&outcome);
    match outcome {
        Ok(p) => {
            info!(label = %p.label, confidence = p.confidence, "prediction served");
            Ok(Json(p))
        }
        Err(e) => {
            warn!(status = e.status().as_u16(), error = %e, "prediction refused");
            Err(e)
        }
    }
}

async fn run_prediction(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Prediction, ApiError> {
    let bytes = read_image_field(multipart?).await?;
    let model = Arc::clone(&state.model);
    let start = Instant::now();
    // Decoding, resizing and inference are CPU-bound; keep them off the async workers.
    let prediction = tokio::task::spawn_blocking(move || -> Result<Prediction, ApiError> {
        let image = preprocess::decode(&bytes).map_err(|e| ApiError::MalformedImage(e.to_string()))?;
        let input = preprocess::preprocess(&image);
        Ok(model.predict(&input)?)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("prediction task aborted: {e}")))??;
    INFERENCE_LATENCY_MS.observe(start.elapsed().as_secs_f64() * 1000.0);
    Ok(prediction)
}

async fn read_image_field(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) {
            return Ok(field.bytes().await?);
        }
    }
    Err(ApiError::MissingImage)
}
