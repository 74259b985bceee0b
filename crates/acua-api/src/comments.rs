use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use acua_types::api::{CreateCommentRequest, Session};
use acua_types::events::GatewayEvent;
use acua_types::models::CommentTarget;
use acua_types::thread::CommentThread;

use crate::error::ApiError;
use crate::notifications;
use crate::state::{AppState, run_db};

pub async fn list_publication_comments(
    State(state): State<AppState>,
    Path(publication_id): Path<Uuid>,
    Extension(_session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    list(state, CommentTarget::Publication(publication_id)).await
}

pub async fn list_post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(_session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    list(state, CommentTarget::Post(post_id)).await
}

pub async fn comment_on_publication(
    State(state): State<AppState>,
    Path(publication_id): Path<Uuid>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    create(state, CommentTarget::Publication(publication_id), session, req).await
}

pub async fn comment_on_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    create(state, CommentTarget::Post(post_id), session, req).await
}

/// Comments come back as a reply tree, oldest first at every level.
async fn list(state: AppState, target: CommentTarget) -> Result<impl IntoResponse, ApiError> {
    let comments = run_db(&state, move |db| db.list_comments(target)).await?;
    Ok(Json(CommentThread::build(comments)))
}

async fn create(
    state: AppState,
    target: CommentTarget,
    session: Session,
    req: CreateCommentRequest,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let posted = run_db(&state, move |db| {
        db.post_comment(target, session.user_id, req.parent_id, &req.body, now)
    })
    .await?;

    state.dispatcher.publish(GatewayEvent::CommentCreate {
        comment: posted.comment.clone(),
    });
    notifications::push(&state, posted.notification).await;

    Ok((StatusCode::CREATED, Json(posted.comment)))
}
