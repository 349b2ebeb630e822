use crate::error::ApiError;
use crate::middleware::auth::TelegramUser;
use crate::models::progress::SaveResponse;
use crate::state::AppState;
use axum::{Json, extract::State};
use tapgame_core::Progress;

/// Returns the caller's saved progress, or a fresh start if there is none yet.
///
/// Never writes: a first visit does not create a row.
pub async fn get_progress(
    State(state): State<AppState>,
    user: TelegramUser,
) -> Result<Json<Progress>, ApiError> {
    let progress = state
        .store
        .load(user.id)
        .await?
        .map(|row| row.progress())
        .unwrap_or_default();

    Ok(Json(progress))
}

/// Stores the caller's progress, replacing whatever was there.
pub async fn save_progress(
    State(state): State<AppState>,
    user: TelegramUser,
    Json(payload): Json<Progress>,
) -> Result<Json<SaveResponse>, ApiError> {
    // 1. Check the submission against the configured policy
    // Only the monotonic policy needs the stored row, so the others skip the read.
    let previous = if state.policy.needs_previous() {
        state.store.load(user.id).await?.map(|row| row.progress())
    } else {
        None
    };
    state.policy.validate(previous, payload)?;

    // 2. Upsert
    state.store.save(user.id, payload).await?;

    tracing::debug!(
        user_id = user.id,
        username = user.username.as_deref().unwrap_or("-"),
        score = payload.score,
        level = payload.level,
        "progress saved"
    );

    Ok(Json(SaveResponse { success: true }))
}
