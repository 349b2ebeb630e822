use crate::error::ApiError;
use crate::models::progress::InitDataQuery;
use crate::state::AppState;
use axum::{extract::FromRequestParts, extract::Query, http::request::Parts};

/// A Telegram user whose init data checked out.
///
/// Use this as a handler parameter and Axum will:
/// 1. Pull `initData` out of the query string
/// 2. Verify its signature against the bot token
/// 3. Decode the embedded user, or reject with 401/403
///
/// Nothing is cached between requests; every call proves its identity again.
#[derive(Debug, Clone)]
pub struct TelegramUser {
    pub id: i64,
    pub username: Option<String>,
}

impl FromRequestParts<AppState> for TelegramUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // 1. Find the payload
        // A query string that doesn't even deserialize is treated the same as a missing one.
        let raw = Query::<InitDataQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(query)| query.init_data)
            .filter(|raw| !raw.is_empty())
            .ok_or(ApiError::AuthMissing)?;

        // 2. Verify and decode
        // Any failure here (bad hash, tampered field, broken user JSON) is a 403.
        let user = state
            .verifier
            .authenticate(&raw)
            .map_err(ApiError::AuthInvalid)?;

        Ok(TelegramUser {
            id: user.id,
            username: user.username,
        })
    }
}
