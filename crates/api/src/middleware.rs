//! Request middleware: API key auth and correlation propagation.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use common::CorrelationId;
use subtle::ConstantTimeEq;

use crate::error::ApiError;
use crate::state::AppState;

/// Correlation header accepted from callers and echoed on responses.
pub const TX_ID_HEADER: &str = "x-tx-id";

/// Shared-secret header required on every business endpoint.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Accepts the caller's `X-TX-ID` or generates one, stores it in the
/// request extensions, and echoes it on the response.
pub async fn correlation(mut request: Request, next: Next) -> Response {
    let correlation = request
        .headers()
        .get(TX_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(CorrelationId::from_header)
        .unwrap_or_default();
    request.extensions_mut().insert(correlation.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(correlation.as_str()) {
        response.headers_mut().insert(TX_ID_HEADER, value);
    }
    response
}

/// Rejects requests whose `X-API-KEY` does not match the configured
/// secret. The comparison is constant-time; an absent header compares
/// as an empty key.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if bool::from(presented.as_bytes().ct_eq(state.api_key.as_bytes())) {
        return next.run(request).await;
    }
    metrics::counter!("auth_failures_total").increment(1);
    let path = request.uri().path().to_string();
    tracing::warn!(path, "rejected request with invalid API key");
    ApiError::unauthorized(path).into_response()
}
