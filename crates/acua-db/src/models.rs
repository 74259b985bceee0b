//! Database row types. These map directly to SQLite rows and are converted
//! into `acua-types` models at the edge of each query.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use acua_types::models::{
    Comment, CommentTarget, Notification, NotificationKind, ParticipantSnapshot, Profile,
    Publication,
};

use crate::{Result, StoreError};

/// Fixed-width RFC 3339 so that text comparison matches time order.
pub fn ts(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{raw}': {e}")))
}

pub fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("id '{raw}': {e}")))
}

pub struct ProfileRow {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub updated_at: String,
}

impl ProfileRow {
    pub fn into_profile(self) -> Result<Profile> {
        Ok(Profile {
            user_id: parse_id(&self.user_id)?,
            display_name: self.display_name,
            avatar_url: self.avatar_url,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

pub struct ConversationRow {
    pub id: String,
    pub participant_low: String,
    pub participant_high: String,
    pub last_message_text: Option<String>,
    pub last_message_sender: Option<String>,
    pub last_message_at: Option<String>,
    pub created_at: String,
}

pub struct MemberRow {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub unread_count: u32,
}

impl MemberRow {
    pub fn snapshot(&self) -> Result<ParticipantSnapshot> {
        Ok(ParticipantSnapshot {
            user_id: parse_id(&self.user_id)?,
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        })
    }
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub payload: String,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub recipient_id: String,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub link: String,
    pub is_read: bool,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar: Option<String>,
    pub created_at: String,
}

impl NotificationRow {
    pub fn into_notification(self) -> Result<Notification> {
        let kind = NotificationKind::parse(&self.kind)
            .ok_or_else(|| StoreError::Corrupt(format!("notification kind '{}'", self.kind)))?;

        Ok(Notification {
            id: parse_id(&self.id)?,
            recipient_id: parse_id(&self.recipient_id)?,
            kind,
            title: self.title,
            body: self.body,
            link: self.link,
            is_read: self.is_read,
            sender: ParticipantSnapshot {
                user_id: parse_id(&self.sender_id)?,
                display_name: self.sender_name,
                avatar_url: self.sender_avatar,
            },
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct PublicationRow {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub body: String,
    pub like_count: u32,
    pub created_at: String,
}

impl PublicationRow {
    pub fn into_publication(self) -> Result<Publication> {
        Ok(Publication {
            id: parse_id(&self.id)?,
            author_id: parse_id(&self.author_id)?,
            title: self.title,
            body: self.body,
            like_count: self.like_count,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}

pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub body: String,
    pub poll: Option<String>,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub target_kind: String,
    pub target_id: String,
    pub author_id: String,
    pub author_name: String,
    pub parent_id: Option<String>,
    pub body: String,
    pub created_at: String,
}

impl CommentRow {
    pub fn into_comment(self) -> Result<Comment> {
        let target_id = parse_id(&self.target_id)?;
        let target = match self.target_kind.as_str() {
            "publication" => CommentTarget::Publication(target_id),
            "post" => CommentTarget::Post(target_id),
            other => return Err(StoreError::Corrupt(format!("comment target '{other}'"))),
        };

        Ok(Comment {
            id: parse_id(&self.id)?,
            target,
            author_id: parse_id(&self.author_id)?,
            author_name: self.author_name,
            parent_id: self.parent_id.as_deref().map(parse_id).transpose()?,
            body: self.body,
            created_at: parse_ts(&self.created_at)?,
        })
    }
}
