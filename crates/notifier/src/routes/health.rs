use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Whether the broker channel client is still open.
    pub channel_open: bool,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let channel_open = state.channel.is_open();

    Json(HealthResponse {
        status: if channel_open { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        channel_open,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
