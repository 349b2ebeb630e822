use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

/// Simple health check endpoint.
///
/// Used by load balancers and monitoring to know if the server is still alive.
/// We ping the store too: without it no progress can be loaded or saved.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let db_status = if state.store.ping().await {
        "Connected"
    } else {
        "Disconnected"
    };

    let response = HealthResponse {
        status: "Tap game server is healthy".to_string(),
        database: db_status.to_string(),
    };

    (StatusCode::OK, Json(response))
}
