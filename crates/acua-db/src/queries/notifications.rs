use chrono::{DateTime, Utc};
use rusqlite::TransactionBehavior;
use tracing::{debug, warn};
use uuid::Uuid;

use acua_types::models::{NewNotification, Notification};
use acua_types::payload::{SNIPPET_LEN, snippet};

use super::MAX_PAGE;
use super::profiles::snapshot_for;
use crate::models::{NotificationRow, ts};
use crate::{Database, Result, StoreError};

impl Database {
    /// Records a notification for the recipient. Returns `None` without
    /// writing anything when the recipient is the actor.
    pub fn notify(&self, new: NewNotification, now: DateTime<Utc>) -> Result<Option<Notification>> {
        if new.recipient_id == new.sender_id {
            debug!("Suppressed {} self-notification for {}", new.kind.as_str(), new.sender_id);
            return Ok(None);
        }

        self.with_conn(|conn| {
            let notification = Notification {
                id: Uuid::new_v4(),
                recipient_id: new.recipient_id,
                kind: new.kind,
                title: new.title,
                body: snippet(&new.body, SNIPPET_LEN),
                link: new.link,
                is_read: false,
                sender: snapshot_for(conn, new.sender_id)?,
                created_at: now,
            };

            conn.execute(
                "INSERT INTO notifications
                    (id, recipient_id, kind, title, body, link, is_read, sender_id, sender_name, sender_avatar, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    notification.id.to_string(),
                    notification.recipient_id.to_string(),
                    notification.kind.as_str(),
                    notification.title,
                    notification.body,
                    notification.link,
                    notification.sender.user_id.to_string(),
                    notification.sender.display_name,
                    notification.sender.avatar_url,
                    ts(now),
                ],
            )?;

            Ok(Some(notification))
        })
    }

    /// Fan-out that runs after a primary write has already committed. A
    /// failure here is logged and swallowed.
    pub(crate) fn notify_best_effort(
        &self,
        new: NewNotification,
        now: DateTime<Utc>,
    ) -> Option<Notification> {
        let recipient = new.recipient_id;
        let kind = new.kind;
        match self.notify(new, now) {
            Ok(notification) => notification,
            Err(e) => {
                warn!("Failed to write {} notification for {}: {}", kind.as_str(), recipient, e);
                None
            }
        }
    }

    /// Newest first.
    pub fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<Notification>> {
        let limit = limit.clamp(1, MAX_PAGE);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, recipient_id, kind, title, body, link, is_read, sender_id, sender_name, sender_avatar, created_at
                 FROM notifications
                 WHERE recipient_id = ?1 AND (?2 = 0 OR is_read = 0)
                 ORDER BY created_at DESC
                 LIMIT ?3",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![user_id.to_string(), unread_only, limit], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        recipient_id: row.get(1)?,
                        kind: row.get(2)?,
                        title: row.get(3)?,
                        body: row.get(4)?,
                        link: row.get(5)?,
                        is_read: row.get(6)?,
                        sender_id: row.get(7)?,
                        sender_name: row.get(8)?,
                        sender_avatar: row.get(9)?,
                        created_at: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(NotificationRow::into_notification).collect()
        })
    }

    pub fn unread_notification_count(&self, user_id: Uuid) -> Result<u32> {
        self.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
                [user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Only the recipient may mark a notification. Idempotent.
    pub fn mark_notification_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2",
                rusqlite::params![notification_id.to_string(), user_id.to_string()],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound("notification"));
            }
            Ok(())
        })
    }

    /// Marks every notification that is unread right now. Anything created
    /// after the unread set was fetched stays unread.
    pub fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let ids = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
                )?;
                stmt.query_map([user_id.to_string()], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };

            let mut marked = 0;
            for id in &ids {
                marked += tx.execute(
                    "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND is_read = 0",
                    [id],
                )?;
            }

            tx.commit()?;
            debug!("Marked {} notifications read for {}", marked, user_id);
            Ok(marked)
        })
    }
}
