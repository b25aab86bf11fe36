use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::error;

use crate::state::AppState;

/// GET /health
/// Reports service version and whether the record store answers.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status, store, code) = match state.store.ping().await {
        Ok(()) => ("ok", "connected", StatusCode::OK),
        Err(e) => {
            error!("Health check failed: {e}");
            ("unhealthy", "unavailable", StatusCode::SERVICE_UNAVAILABLE)
        }
    };
    (
        code,
        Json(json!({
            "status": status,
            "store": store,
            "version": env!("CARGO_PKG_VERSION"),
            "service": "jobtrack-api"
        })),
    )
}
