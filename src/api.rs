//! HTTP surface: health check, Prometheus metrics, and the manual trigger.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::pipeline::{run_variant, CycleOutcome, Services, Variant};

#[derive(Clone)]
pub struct ApiState {
    pub services: Arc<Services>,
    /// Shared secret for `/trigger`; `None` leaves the endpoint ungated.
    pub trigger_token: Option<String>,
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/trigger", post(trigger))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `POST /trigger?type=rubric|news|history[&token=...]`
///
/// Runs one pipeline cycle on demand. Exceptions surface as a 500 with a
/// textual error; an early-exited cycle is a 200 "skipped".
async fn trigger(
    State(state): State<ApiState>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    if let Some(expected) = &state.trigger_token {
        let supplied = params.get("token").map(String::as_str).unwrap_or_default();
        if supplied != expected {
            return (StatusCode::UNAUTHORIZED, "bad token".to_string());
        }
    }

    let kind = params.get("type").map(String::as_str).unwrap_or_default();
    let Ok(variant) = kind.parse::<Variant>() else {
        return (
            StatusCode::BAD_REQUEST,
            format!("unknown type '{kind}' (expected rubric|news|history)"),
        );
    };

    match run_variant(&state.services, variant).await {
        Ok(CycleOutcome::Published) => (StatusCode::OK, "published".to_string()),
        Ok(CycleOutcome::Skipped(reason)) => (StatusCode::OK, format!("skipped: {reason}")),
        Err(e) => {
            warn!(error = ?e, "manual trigger cycle failed");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("error: {e:#}"))
        }
    }
}
