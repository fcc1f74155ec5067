// HTTP request handlers
use crate::application::health_monitor::HealthSnapshot;
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(connection_status))
        .route("/readings/latest", get(latest_reading))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current connection state and last error, for the status badge
pub async fn connection_status(State(state): State<Arc<AppState>>) -> Json<HealthSnapshot> {
    Json(state.health.snapshot())
}

/// Newest reading delivered by the poller
pub async fn latest_reading(State(state): State<Arc<AppState>>) -> Response {
    let latest = state.latest_reading.borrow().clone();
    match latest {
        Some(reading) => Json(reading).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
