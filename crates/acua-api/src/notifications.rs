use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use acua_db::queries::DEFAULT_PAGE;
use acua_types::api::{MarkAllReadResponse, Session};
use acua_types::events::GatewayEvent;
use acua_types::models::Notification;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = run_db(&state, move |db| {
        db.list_notifications(session.user_id, query.unread_only, query.limit)
    })
    .await?;

    Ok(Json(notifications))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    run_db(&state, move |db| db.mark_notification_read(notification_id, session.user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let marked = run_db(&state, move |db| db.mark_all_notifications_read(session.user_id)).await?;
    Ok(Json(MarkAllReadResponse { marked }))
}

/// Push a freshly created notification to its recipient, if connected.
pub(crate) async fn push(state: &AppState, notification: Option<Notification>) {
    if let Some(notification) = notification {
        state
            .dispatcher
            .send_to_user(
                notification.recipient_id,
                GatewayEvent::NotificationCreate { notification },
            )
            .await;
    }
}
