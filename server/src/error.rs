// Request-level errors and how they map onto HTTP responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tapgame_core::{InitDataError, ProgressViolation};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Missing Telegram init data")]
    AuthMissing,

    // The cause is logged but never echoed back to the caller.
    #[error("Invalid Telegram data")]
    AuthInvalid(#[source] InitDataError),

    #[error("Invalid progress: {0}")]
    InvalidProgress(#[from] ProgressViolation),

    #[error("Server error")]
    StoreUnavailable(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthMissing => StatusCode::UNAUTHORIZED,
            ApiError::AuthInvalid(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidProgress(_) => StatusCode::BAD_REQUEST,
            ApiError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::AuthMissing => tracing::debug!("rejected request without init data"),
            ApiError::AuthInvalid(cause) => tracing::warn!(%cause, "rejected init data"),
            ApiError::InvalidProgress(violation) => {
                tracing::warn!(%violation, "rejected progress submission")
            }
            ApiError::StoreUnavailable(e) => tracing::error!(error = ?e, "progress store failure"),
        }

        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
