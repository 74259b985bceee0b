use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use acua_db::queries::DEFAULT_PAGE;
use acua_types::api::{
    ConversationResponse, OpenConversationRequest, SendMessageRequest, Session,
};
use acua_types::events::GatewayEvent;
use acua_types::models::Conversation;

use crate::error::ApiError;
use crate::notifications;
use crate::state::{AppState, run_db};

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor: id of the oldest message already loaded.
    pub before: Option<Uuid>,
}

fn default_limit() -> u32 {
    DEFAULT_PAGE
}

/// POST /conversations finds or creates a conversation with another user.
pub async fn open_conversation(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<OpenConversationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let (conversation, created) = run_db(&state, move |db| {
        db.find_or_create_conversation(session.user_id, req.other_user_id, now)
    })
    .await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(ConversationResponse::for_viewer(conversation, session.user_id))))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = run_db(&state, move |db| db.list_conversations(session.user_id)).await?;

    let views: Vec<ConversationResponse> = conversations
        .into_iter()
        .map(|c| ConversationResponse::for_viewer(c, session.user_id))
        .collect();
    Ok(Json(views))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation =
        run_db(&state, move |db| db.get_conversation(conversation_id, session.user_id)).await?;
    Ok(Json(ConversationResponse::for_viewer(conversation, session.user_id)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = run_db(&state, move |db| {
        db.list_messages(conversation_id, session.user_id, query.limit, query.before)
    })
    .await?;

    Ok(Json(messages))
}

/// POST /conversations/{id}/messages
///
/// Live delivery after the store has committed: the message goes to the
/// conversation topic, each participant gets their refreshed summary, and
/// the recipient gets the notification.
pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(session): Extension<Session>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let sent = run_db(&state, move |db| {
        db.send_message(conversation_id, session.user_id, &req.payload, now)
    })
    .await?;

    debug!("{} sent message {} in {}", session.user_id, sent.message.id, conversation_id);

    state.dispatcher.publish(GatewayEvent::MessageCreate {
        message: sent.message.clone(),
    });
    push_conversation(&state, &sent.conversation).await;
    notifications::push(&state, sent.notification).await;

    Ok((StatusCode::CREATED, Json(sent.message)))
}

/// POST /conversations/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = run_db(&state, move |db| {
        db.mark_conversation_read(conversation_id, session.user_id)
    })
    .await?;

    let view = ConversationResponse::for_viewer(conversation, session.user_id);
    state
        .dispatcher
        .send_to_user(
            session.user_id,
            GatewayEvent::ConversationUpdate { conversation: view.clone() },
        )
        .await;

    Ok(Json(view))
}

async fn push_conversation(state: &AppState, conversation: &Conversation) {
    for user_id in conversation.participant_ids {
        let view = ConversationResponse::for_viewer(conversation.clone(), user_id);
        state
            .dispatcher
            .send_to_user(user_id, GatewayEvent::ConversationUpdate { conversation: view })
            .await;
    }
}
