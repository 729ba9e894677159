use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failures while making the model artifact available on local disk.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("artifact store answered with status {0}")]
    Status(u16),
    #[error("artifact store returned a web page instead of the artifact; check the object is shared publicly")]
    UnexpectedContent,
    #[error("artifact store returned an empty body")]
    Empty,
    #[error("artifact checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Model lifecycle and inference failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("model is still loading")]
    NotReady,
    #[error("model not loaded: {0}")]
    Unavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Everything the predict endpoint can answer with besides a prediction.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no image uploaded; expected a multipart file field named `image`")]
    MissingImage,
    #[error("uploaded file is not a decodable image: {0}")]
    MalformedImage(String),
    #[error("failed to read upload: {message}")]
    PayloadRead { status: StatusCode, message: String },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("prediction failed: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingImage | ApiError::MalformedImage(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadRead { status, .. } => *status,
            ApiError::Model(ModelError::NotReady | ModelError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Model(ModelError::Inference(_)) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for the outcome dimension of the prediction counter.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::MissingImage | ApiError::MalformedImage(_) | ApiError::PayloadRead { .. } => "bad_request",
            ApiError::Model(ModelError::NotReady | ModelError::Unavailable(_)) => "not_ready",
            ApiError::Model(ModelError::Inference(_)) | ApiError::Internal(_) => "error",
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self { ApiError::PayloadRead { status: e.status(), message: e.body_text() } }
}

impl From<MultipartRejection> for ApiError {
    fn from(e: MultipartRejection) -> Self { ApiError::PayloadRead { status: e.status(), message: e.body_text() } }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
