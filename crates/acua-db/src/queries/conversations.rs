use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use acua_types::models::{
    Conversation, DEFAULT_DISPLAY_NAME, LastMessage, Message, NewNotification, Notification,
    NotificationKind,
};
use acua_types::participants::ParticipantKey;
use acua_types::payload::MessagePayload;

use super::profiles::snapshot_for;
use super::{MAX_PAGE, OptionalExt};
use crate::models::{ConversationRow, MemberRow, MessageRow, parse_id, parse_ts, ts};
use crate::{Database, Result, StoreError};

const CONVERSATION_COLUMNS: &str = "id, participant_low, participant_high, last_message_text, \
     last_message_sender, last_message_at, created_at";

/// Everything produced by one send: the primary write and its derived
/// notification (absent if that best-effort write failed).
#[derive(Debug, Clone)]
pub struct MessageSent {
    pub message: Message,
    pub conversation: Conversation,
    pub notification: Option<Notification>,
}

impl Database {
    /// Returns the conversation between `a` and `b`, creating it on first
    /// contact. The boolean is `true` when it was just created.
    pub fn find_or_create_conversation(
        &self,
        a: Uuid,
        b: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Conversation, bool)> {
        let key = ParticipantKey::new(a, b).ok_or(StoreError::SelfConversation)?;

        self.with_conn_mut(|conn| {
            // IMMEDIATE: take the write lock before the lookup so two callers
            // cannot both miss and insert.
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT id FROM conversations WHERE participant_key = ?1",
                    [key.to_string()],
                    |row| row.get(0),
                )
                .optional()?;

            let (id, created) = match existing {
                Some(id) => (id, false),
                None => {
                    let id = Uuid::new_v4().to_string();
                    let [low, high] = key.ids();
                    tx.execute(
                        "INSERT INTO conversations (id, participant_key, participant_low, participant_high, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        rusqlite::params![id, key.to_string(), low.to_string(), high.to_string(), ts(now)],
                    )?;

                    for user_id in key.ids() {
                        let snapshot = snapshot_for(&tx, user_id)?;
                        tx.execute(
                            "INSERT INTO conversation_members (conversation_id, user_id, display_name, avatar_url, unread_count)
                             VALUES (?1, ?2, ?3, ?4, 0)",
                            rusqlite::params![id, user_id.to_string(), snapshot.display_name, snapshot.avatar_url],
                        )?;
                    }

                    debug!("Created conversation {} for {}", id, key);
                    (id, true)
                }
            };

            let conversation =
                load_conversation(&tx, &id)?.ok_or(StoreError::NotFound("conversation"))?;
            tx.commit()?;
            Ok((conversation, created))
        })
    }

    /// Fetch a conversation on behalf of `viewer`, who must take part in it.
    pub fn get_conversation(&self, conversation_id: Uuid, viewer: Uuid) -> Result<Conversation> {
        self.with_conn(|conn| {
            let conversation = load_conversation(conn, &conversation_id.to_string())?
                .ok_or(StoreError::NotFound("conversation"))?;
            if !conversation.is_participant(viewer) {
                return Err(StoreError::NotParticipant);
            }
            Ok(conversation)
        })
    }

    /// All conversations of a user, most recently active first.
    pub fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id FROM conversations c
                 JOIN conversation_members m ON m.conversation_id = c.id
                 WHERE m.user_id = ?1
                 ORDER BY COALESCE(c.last_message_at, c.created_at) DESC",
            )?;
            let ids = stmt
                .query_map([user_id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut conversations = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(conversation) = load_conversation(conn, &id)? {
                    conversations.push(conversation);
                }
            }
            Ok(conversations)
        })
    }

    /// Appends a message and bumps the recipient's unread counter.
    ///
    /// The message row, the `last_message` summary and the counter are
    /// written in one transaction. Notifications are not part of it.
    pub fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        payload: &MessagePayload,
        now: DateTime<Utc>,
    ) -> Result<(Message, Conversation)> {
        payload.validate().map_err(StoreError::invalid)?;

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            payload: payload.clone(),
            created_at: now,
        };
        let encoded = serde_json::to_string(payload)?;
        let summary = payload.summary();
        let cid = conversation_id.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let conversation =
                load_conversation(&tx, &cid)?.ok_or(StoreError::NotFound("conversation"))?;
            let recipient = conversation
                .other_participant(sender_id)
                .ok_or(StoreError::NotParticipant)?;

            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![message.id.to_string(), cid, sender_id.to_string(), encoded, ts(now)],
            )?;

            tx.execute(
                "UPDATE conversations
                 SET last_message_text = ?2, last_message_sender = ?3, last_message_at = ?4
                 WHERE id = ?1",
                rusqlite::params![cid, summary, sender_id.to_string(), ts(now)],
            )?;

            tx.execute(
                "UPDATE conversation_members SET unread_count = unread_count + 1
                 WHERE conversation_id = ?1 AND user_id = ?2",
                rusqlite::params![cid, recipient.to_string()],
            )?;

            let conversation =
                load_conversation(&tx, &cid)?.ok_or(StoreError::NotFound("conversation"))?;
            tx.commit()?;
            Ok((message, conversation))
        })
    }

    /// Appends a message, then notifies the other participant.
    pub fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        payload: &MessagePayload,
        now: DateTime<Utc>,
    ) -> Result<MessageSent> {
        let (message, conversation) = self.append_message(conversation_id, sender_id, payload, now)?;

        let notification = conversation.other_participant(sender_id).and_then(|recipient_id| {
            let sender_name = conversation
                .participant(sender_id)
                .map(|p| p.display_name.as_str())
                .unwrap_or(DEFAULT_DISPLAY_NAME);

            self.notify_best_effort(
                NewNotification {
                    recipient_id,
                    sender_id,
                    kind: NotificationKind::NewMessage,
                    title: format!("Nuevo mensaje de {sender_name}"),
                    body: message.payload.summary(),
                    link: format!("/mensajes/{}", conversation.id),
                },
                now,
            )
        });

        Ok(MessageSent {
            message,
            conversation,
            notification,
        })
    }

    /// Messages in ascending time order. `before` pages backwards: pass the
    /// id of the oldest message already shown. Messages sharing a timestamp
    /// are ordered by insertion, so the cursor is `(created_at, seq)`.
    pub fn list_messages(
        &self,
        conversation_id: Uuid,
        viewer: Uuid,
        limit: u32,
        before: Option<Uuid>,
    ) -> Result<Vec<Message>> {
        let limit = limit.clamp(1, MAX_PAGE);
        let cid = conversation_id.to_string();

        self.with_conn(|conn| {
            ensure_participant(conn, &cid, viewer)?;

            let cursor: Option<(String, i64)> = match before {
                Some(id) => Some(
                    conn.query_row(
                        "SELECT created_at, seq FROM messages WHERE id = ?1 AND conversation_id = ?2",
                        rusqlite::params![id.to_string(), cid],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?
                    .ok_or(StoreError::NotFound("message"))?,
                ),
                None => None,
            };
            let (cursor_at, cursor_seq) = cursor.unzip();

            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, sender_id, payload, created_at
                 FROM messages
                 WHERE conversation_id = ?1
                   AND (?2 IS NULL OR created_at < ?2 OR (created_at = ?2 AND seq < ?3))
                 ORDER BY created_at DESC, seq DESC
                 LIMIT ?4",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![cid, cursor_at, cursor_seq, limit], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        sender_id: row.get(2)?,
                        payload: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            // Fetched newest first so LIMIT keeps the latest page
            let mut messages = rows
                .into_iter()
                .map(into_message)
                .collect::<Result<Vec<_>>>()?;
            messages.reverse();
            Ok(messages)
        })
    }

    /// Resets the caller's unread counter. Idempotent.
    pub fn mark_conversation_read(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Conversation> {
        let cid = conversation_id.to_string();

        self.with_conn(|conn| {
            ensure_participant(conn, &cid, user_id)?;
            conn.execute(
                "UPDATE conversation_members SET unread_count = 0
                 WHERE conversation_id = ?1 AND user_id = ?2",
                rusqlite::params![cid, user_id.to_string()],
            )?;
            load_conversation(conn, &cid)?.ok_or(StoreError::NotFound("conversation"))
        })
    }

    /// Sum of a user's unread counters across all conversations.
    pub fn total_unread(&self, user_id: Uuid) -> Result<u32> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COALESCE(SUM(unread_count), 0) FROM conversation_members WHERE user_id = ?1",
                [user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(u32::try_from(total).unwrap_or(u32::MAX))
        })
    }
}

fn ensure_participant(conn: &Connection, conversation_id: &str, user_id: Uuid) -> Result<()> {
    let member: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM conversation_members WHERE conversation_id = ?1 AND user_id = ?2",
            rusqlite::params![conversation_id, user_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    if member.is_some() {
        return Ok(());
    }

    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM conversations WHERE id = ?1",
            [conversation_id],
            |row| row.get(0),
        )
        .optional()?;
    match exists {
        Some(_) => Err(StoreError::NotParticipant),
        None => Err(StoreError::NotFound("conversation")),
    }
}

fn load_conversation(conn: &Connection, id: &str) -> Result<Option<Conversation>> {
    let row = conn
        .query_row(
            &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
            [id],
            map_conversation_row,
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT user_id, display_name, avatar_url, unread_count
         FROM conversation_members WHERE conversation_id = ?1
         ORDER BY user_id",
    )?;
    let members = stmt
        .query_map([id], |row| {
            Ok(MemberRow {
                user_id: row.get(0)?,
                display_name: row.get(1)?,
                avatar_url: row.get(2)?,
                unread_count: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    assemble(row, members).map(Some)
}

fn map_conversation_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        participant_low: row.get(1)?,
        participant_high: row.get(2)?,
        last_message_text: row.get(3)?,
        last_message_sender: row.get(4)?,
        last_message_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn assemble(row: ConversationRow, members: Vec<MemberRow>) -> Result<Conversation> {
    let last_message = match (row.last_message_text, row.last_message_sender, row.last_message_at) {
        (Some(text), Some(sender), Some(at)) => Some(LastMessage {
            text,
            sender_id: parse_id(&sender)?,
            sent_at: parse_ts(&at)?,
        }),
        _ => None,
    };

    let participants = members
        .iter()
        .map(MemberRow::snapshot)
        .collect::<Result<Vec<_>>>()?;
    let unread_counts = members
        .iter()
        .map(|m| -> Result<(Uuid, u32)> { Ok((parse_id(&m.user_id)?, m.unread_count)) })
        .collect::<Result<HashMap<_, _>>>()?;

    Ok(Conversation {
        id: parse_id(&row.id)?,
        participant_ids: [parse_id(&row.participant_low)?, parse_id(&row.participant_high)?],
        participants,
        last_message,
        unread_counts,
        created_at: parse_ts(&row.created_at)?,
    })
}

fn into_message(row: MessageRow) -> Result<Message> {
    Ok(Message {
        id: parse_id(&row.id)?,
        conversation_id: parse_id(&row.conversation_id)?,
        sender_id: parse_id(&row.sender_id)?,
        payload: serde_json::from_str(&row.payload)?,
        created_at: parse_ts(&row.created_at)?,
    })
}
