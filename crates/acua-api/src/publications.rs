use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use acua_types::api::{CreatePublicationRequest, LikeResponse, Session};
use acua_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::notifications;
use crate::state::{AppState, run_db};

pub async fn create_publication(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreatePublicationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let publication = run_db(&state, move |db| {
        db.create_publication(session.user_id, &req.title, &req.body, now)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(publication)))
}

pub async fn get_publication(
    State(state): State<AppState>,
    Path(publication_id): Path<Uuid>,
    Extension(_session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let publication = run_db(&state, move |db| db.get_publication(publication_id))
        .await?
        .ok_or(ApiError::NotFound("publication"))?;

    Ok(Json(publication))
}

/// POST /publications/{id}/like: toggles the caller's like.
pub async fn toggle_like(
    State(state): State<AppState>,
    Path(publication_id): Path<Uuid>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let toggled = run_db(&state, move |db| {
        db.toggle_publication_like(publication_id, session.user_id, now)
    })
    .await?;

    state.dispatcher.publish(GatewayEvent::PublicationLikeUpdate {
        publication_id,
        like_count: toggled.like_count,
    });
    notifications::push(&state, toggled.notification).await;

    Ok(Json(LikeResponse {
        liked: toggled.liked,
        like_count: toggled.like_count,
    }))
}
