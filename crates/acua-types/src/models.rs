use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::participants::ParticipantKey;
use crate::payload::MessagePayload;
use crate::poll::Poll;

/// Display name used when a user has never saved a profile.
pub const DEFAULT_DISPLAY_NAME: &str = "Usuario";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Display snapshot of a participant, captured when the conversation was
/// created. Never refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    pub user_id: Uuid,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    pub text: String,
    pub sender_id: Uuid,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// Always stored lower id first.
    pub participant_ids: [Uuid; 2],
    pub participants: Vec<ParticipantSnapshot>,
    pub last_message: Option<LastMessage>,
    pub unread_counts: HashMap<Uuid, u32>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participant_ids.contains(&user_id)
    }

    /// The participant who is not `me`.
    pub fn other_participant(&self, me: Uuid) -> Option<Uuid> {
        let [low, high] = self.participant_ids;
        ParticipantKey::new(low, high)?.other(me)
    }

    pub fn participant(&self, user_id: Uuid) -> Option<&ParticipantSnapshot> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn unread_for(&self, user_id: Uuid) -> u32 {
        self.unread_counts.get(&user_id).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub payload: MessagePayload,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMessage,
    NewComment,
    NewReply,
    PublicationLike,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewMessage => "new_message",
            Self::NewComment => "new_comment",
            Self::NewReply => "new_reply",
            Self::PublicationLike => "publication_like",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new_message" => Some(Self::NewMessage),
            "new_comment" => Some(Self::NewComment),
            "new_reply" => Some(Self::NewReply),
            "publication_like" => Some(Self::PublicationLike),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub link: String,
    pub is_read: bool,
    pub sender: ParticipantSnapshot,
    pub created_at: DateTime<Utc>,
}

/// Input to the notification fan-out.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub sender_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub like_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub poll: Option<Poll>,
    pub created_at: DateTime<Utc>,
}

/// The document a comment thread hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CommentTarget {
    Publication(Uuid),
    Post(Uuid),
}

impl CommentTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Publication(_) => "publication",
            Self::Post(_) => "post",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Publication(id) | Self::Post(id) => *id,
        }
    }

    /// Client route for the document, used as the notification deep link.
    pub fn link(&self) -> String {
        match self {
            Self::Publication(id) => format!("/publicaciones/{id}"),
            Self::Post(id) => format!("/foro/{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub target: CommentTarget,
    pub author_id: Uuid,
    pub author_name: String,
    pub parent_id: Option<Uuid>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
