use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Conversation, LastMessage, ParticipantSnapshot};
use crate::payload::MessagePayload;
use crate::poll::{NewPoll, Poll, PollStatus};

// -- Session --

/// Bearer token claims. Shared by the REST middleware and the WebSocket
/// gateway; handed explicitly to every operation instead of living in a
/// global auth context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "sub")]
    pub user_id: Uuid,
    #[serde(rename = "name")]
    pub display_name: String,
    pub exp: usize,
}

// -- Profile --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnreadSummary {
    pub messages: u32,
    pub notifications: u32,
}

// -- Conversations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenConversationRequest {
    pub other_user_id: Uuid,
}

/// A conversation as seen by one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub participant_ids: [Uuid; 2],
    pub participants: Vec<ParticipantSnapshot>,
    pub last_message: Option<LastMessage>,
    pub unread_counts: HashMap<Uuid, u32>,
    pub unread: u32,
    pub created_at: DateTime<Utc>,
}

impl ConversationResponse {
    pub fn for_viewer(conversation: Conversation, viewer: Uuid) -> Self {
        let unread = conversation.unread_for(viewer);
        Self {
            id: conversation.id,
            participant_ids: conversation.participant_ids,
            participants: conversation.participants,
            last_message: conversation.last_message,
            unread_counts: conversation.unread_counts,
            unread,
            created_at: conversation.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub payload: MessagePayload,
}

// -- Notifications --

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub marked: usize,
}

// -- Publications & posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePublicationRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub title: String,
    pub body: String,
    pub poll: Option<NewPoll>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub option_index: usize,
}

/// Poll snapshot returned after a vote, including the caller's selection.
#[derive(Debug, Serialize)]
pub struct PollResponse {
    pub post_id: Uuid,
    pub status: PollStatus,
    pub my_vote: Option<usize>,
    pub poll: Poll,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub body: String,
    pub parent_id: Option<Uuid>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
