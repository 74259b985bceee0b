use chrono::{DateTime, Utc};
use rusqlite::TransactionBehavior;
use uuid::Uuid;

use acua_types::models::{Comment, CommentTarget, NewNotification, Notification, NotificationKind};

use super::posts::post_author;
use super::profiles::snapshot_for;
use super::publications::publication_author;
use super::{OptionalExt, required_text};
use crate::models::{CommentRow, parse_id, ts};
use crate::{Database, Result, StoreError};

const MAX_COMMENT: usize = 2_000;

#[derive(Debug, Clone)]
pub struct CommentPosted {
    pub comment: Comment,
    pub notification: Option<Notification>,
}

impl Database {
    /// Posts a comment, or a reply when `parent_id` is set.
    ///
    /// A top-level comment notifies the author of the target document; a
    /// reply notifies the author of the parent comment instead. Never both.
    pub fn post_comment(
        &self,
        target: CommentTarget,
        author_id: Uuid,
        parent_id: Option<Uuid>,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<CommentPosted> {
        let body = required_text("comment", body, MAX_COMMENT)?;

        let (comment, target_author, parent_author) = self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let target_author = match target {
                CommentTarget::Publication(id) => publication_author(&tx, id)?,
                CommentTarget::Post(id) => post_author(&tx, id)?,
            }
            .ok_or(StoreError::NotFound(target.kind()))?;

            let parent_author = match parent_id {
                Some(parent) => {
                    let row: Option<(String, String, String)> = tx
                        .query_row(
                            "SELECT author_id, target_kind, target_id FROM comments WHERE id = ?1",
                            [parent.to_string()],
                            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                        )
                        .optional()?;
                    match row {
                        Some((author, kind, id))
                            if kind == target.kind() && id == target.id().to_string() =>
                        {
                            Some(parse_id(&author)?)
                        }
                        _ => return Err(StoreError::NotFound("parent comment")),
                    }
                }
                None => None,
            };

            let author = snapshot_for(&tx, author_id)?;
            let comment = Comment {
                id: Uuid::new_v4(),
                target,
                author_id,
                author_name: author.display_name,
                parent_id,
                body,
                created_at: now,
            };

            tx.execute(
                "INSERT INTO comments (id, target_kind, target_id, author_id, author_name, parent_id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    comment.id.to_string(),
                    target.kind(),
                    target.id().to_string(),
                    author_id.to_string(),
                    comment.author_name,
                    parent_id.map(|p| p.to_string()),
                    comment.body,
                    ts(now),
                ],
            )?;

            tx.commit()?;
            Ok((comment, target_author, parent_author))
        })?;

        let (recipient_id, kind, title) = match parent_author {
            Some(parent_author) => (
                parent_author,
                NotificationKind::NewReply,
                format!("{} respondió a tu comentario", comment.author_name),
            ),
            None => (
                target_author,
                NotificationKind::NewComment,
                match target {
                    CommentTarget::Publication(_) => {
                        format!("{} comentó tu publicación", comment.author_name)
                    }
                    CommentTarget::Post(_) => {
                        format!("{} comentó tu tema del foro", comment.author_name)
                    }
                },
            ),
        };

        let notification = self.notify_best_effort(
            NewNotification {
                recipient_id,
                sender_id: author_id,
                kind,
                title,
                body: comment.body.clone(),
                link: target.link(),
            },
            now,
        );

        Ok(CommentPosted {
            comment,
            notification,
        })
    }

    /// Flat list in posting order; see `CommentThread::build` for the tree.
    pub fn list_comments(&self, target: CommentTarget) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, target_kind, target_id, author_id, author_name, parent_id, body, created_at
                 FROM comments
                 WHERE target_kind = ?1 AND target_id = ?2
                 ORDER BY created_at ASC, seq ASC",
            )?;

            let rows = stmt
                .query_map(rusqlite::params![target.kind(), target.id().to_string()], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        target_kind: row.get(1)?,
                        target_id: row.get(2)?,
                        author_id: row.get(3)?,
                        author_name: row.get(4)?,
                        parent_id: row.get(5)?,
                        body: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(CommentRow::into_comment).collect()
        })
    }
}
