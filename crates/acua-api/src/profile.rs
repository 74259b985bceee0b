use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;

use acua_types::api::{Session, UnreadSummary, UpdateProfileRequest};

use crate::error::ApiError;
use crate::state::{AppState, run_db};

/// PUT /me/profile: display fields used for conversation and notification
/// snapshots.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let profile = run_db(&state, move |db| {
        db.upsert_profile(session.user_id, &req.display_name, req.avatar_url.as_deref(), now)
    })
    .await?;

    Ok(Json(profile))
}

/// GET /me/unread: badge counts.
pub async fn unread(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = run_db(&state, move |db| {
        Ok(UnreadSummary {
            messages: db.total_unread(session.user_id)?,
            notifications: db.unread_notification_count(session.user_id)?,
        })
    })
    .await?;

    Ok(Json(summary))
}
