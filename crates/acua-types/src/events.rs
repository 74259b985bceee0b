use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::ConversationResponse;
use crate::models::{Comment, CommentTarget, Message, Notification};
use crate::poll::Poll;

/// Something a client can watch for live updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Topic {
    Conversation(Uuid),
    Post(Uuid),
    Publication(Uuid),
}

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, display_name: String },

    /// A message was appended to a conversation
    MessageCreate { message: Message },

    /// Summary or unread count of one of the recipient's conversations changed
    ConversationUpdate { conversation: ConversationResponse },

    /// A notification was created for the recipient
    NotificationCreate { notification: Notification },

    /// New tally after a vote
    PollUpdate { post_id: Uuid, poll: Poll },

    /// A comment or reply was posted
    CommentCreate { comment: Comment },

    /// Like count of a publication changed
    PublicationLikeUpdate { publication_id: Uuid, like_count: u32 },
}

impl GatewayEvent {
    /// Returns the topic if this event is scoped to one document.
    /// Events that return `None` are only ever sent to a specific user.
    pub fn topic(&self) -> Option<Topic> {
        match self {
            Self::MessageCreate { message } => Some(Topic::Conversation(message.conversation_id)),
            Self::PollUpdate { post_id, .. } => Some(Topic::Post(*post_id)),
            Self::CommentCreate { comment } => Some(match comment.target {
                CommentTarget::Publication(id) => Topic::Publication(id),
                CommentTarget::Post(id) => Topic::Post(id),
            }),
            Self::PublicationLikeUpdate { publication_id, .. } => {
                Some(Topic::Publication(*publication_id))
            }
            Self::Ready { .. } | Self::ConversationUpdate { .. } | Self::NotificationCreate { .. } => {
                None
            }
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Start receiving events for these topics
    Subscribe { topics: Vec<Topic> },

    /// Stop receiving events for these topics
    Unsubscribe { topics: Vec<Topic> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_command_wire_format() {
        let id = Uuid::nil();
        let raw = format!(r#"{{"type":"Subscribe","data":{{"topics":[{{"type":"post","id":"{id}"}}]}}}}"#);
        let cmd: GatewayCommand = serde_json::from_str(&raw).unwrap();
        match cmd {
            GatewayCommand::Subscribe { topics } => assert_eq!(topics, vec![Topic::Post(id)]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
