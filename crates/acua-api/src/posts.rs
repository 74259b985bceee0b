use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use acua_types::api::{CreatePostRequest, PollResponse, Session, VoteRequest};
use acua_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

pub async fn create_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let post = run_db(&state, move |db| {
        db.create_post(session.user_id, &req.title, &req.body, req.poll, now)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(_session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let post = run_db(&state, move |db| db.get_post(post_id))
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    Ok(Json(post))
}

/// POST /posts/{id}/vote
///
/// 409 "poll ended" once the deadline has passed; re-voting the same option
/// returns the unchanged tally.
pub async fn vote(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(session): Extension<Session>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let (poll, outcome) = run_db(&state, move |db| {
        db.cast_vote(post_id, session.user_id, req.option_index, now)
    })
    .await?;

    if outcome.mutated() {
        state.dispatcher.publish(GatewayEvent::PollUpdate {
            post_id,
            poll: poll.clone(),
        });
    }

    Ok(Json(PollResponse {
        post_id,
        status: poll.status(now),
        my_vote: poll.vote_of(session.user_id),
        poll,
    }))
}
