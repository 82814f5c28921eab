//! HTTP edge for the order fulfillment services.
//!
//! Routes requests to the orchestrator, settler, and tokenizer, with
//! API-key auth, correlation propagation, structured logging (tracing),
//! and Prometheus metrics. `/health` and `/metrics` are the only
//! unauthenticated endpoints.

pub mod config;
pub mod error;
pub mod middleware;
pub mod ports;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::{AppState, CollaboratorSet, DefaultState, Stores, create_default_state, create_state};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/orders", post(routes::orders::create))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/payments/charge", post(routes::payments::charge))
        .route("/payments/{id}", get(routes::payments::get))
        .route("/tokenize", post(routes::tokens::tokenize))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ))
        .with_state(state)
        .route("/health", get(routes::health::check))
        .merge(metrics_router)
        .layer(axum::middleware::from_fn(middleware::correlation))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
