//! HTTP handlers for storefront-service.

pub mod admin;
pub mod carts;
pub mod catalog;
pub mod orders;
pub mod payment;
pub mod stats;
pub mod users;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{services::get_metrics, AppState};

pub async fn root() -> &'static str {
    "Grips & Gears storefront is running"
}

/// Liveness plus a round-trip to the order store.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.orders.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "storefront-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "service": "storefront-service" })),
            )
        }
    }
}

pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
