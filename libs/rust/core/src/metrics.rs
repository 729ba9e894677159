//! Prometheus exposition for the default registry.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use prometheus::{Encoder, TextEncoder};

/// Render every collector registered in the default registry as Prometheus text.
pub fn render() -> Result<Vec<u8>, prometheus::Error> {
    let families = prometheus::gather();
    let mut buf = Vec::new();
    TextEncoder::new().encode(&families, &mut buf)?;
    Ok(buf)
}

/// axum handler for `GET /metrics`.
pub async fn metrics_handler() -> Response {
    match render() {
        Ok(buf) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], buf).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("encode error: {e}")).into_response(),
    }
}
