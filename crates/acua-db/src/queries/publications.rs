use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use acua_types::models::{NewNotification, Notification, NotificationKind, Publication};

use super::profiles::snapshot_for;
use super::{OptionalExt, required_text};
use crate::models::{PublicationRow, ts};
use crate::{Database, Result, StoreError};

const MAX_TITLE: usize = 200;
const MAX_BODY: usize = 20_000;

#[derive(Debug, Clone)]
pub struct LikeToggled {
    pub liked: bool,
    pub like_count: u32,
    pub notification: Option<Notification>,
}

impl Database {
    pub fn create_publication(
        &self,
        author_id: Uuid,
        title: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<Publication> {
        let publication = Publication {
            id: Uuid::new_v4(),
            author_id,
            title: required_text("title", title, MAX_TITLE)?,
            body: required_text("body", body, MAX_BODY)?,
            like_count: 0,
            created_at: now,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO publications (id, author_id, title, body, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    publication.id.to_string(),
                    author_id.to_string(),
                    publication.title,
                    publication.body,
                    ts(now),
                ],
            )?;
            Ok(())
        })?;

        Ok(publication)
    }

    pub fn get_publication(&self, id: Uuid) -> Result<Option<Publication>> {
        self.with_conn(|conn| query_publication(conn, id))
    }

    /// Likes the publication, or removes the like if the user already gave
    /// one. A new like notifies the author.
    pub fn toggle_publication_like(
        &self,
        publication_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<LikeToggled> {
        let pid = publication_id.to_string();
        let uid = user_id.to_string();

        let (publication, liked, like_count, liker) = self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let publication =
                query_publication(&tx, publication_id)?.ok_or(StoreError::NotFound("publication"))?;

            let existing: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM publication_likes WHERE publication_id = ?1 AND user_id = ?2",
                    rusqlite::params![pid, uid],
                    |row| row.get(0),
                )
                .optional()?;

            let liked = if existing.is_some() {
                tx.execute(
                    "DELETE FROM publication_likes WHERE publication_id = ?1 AND user_id = ?2",
                    rusqlite::params![pid, uid],
                )?;
                false
            } else {
                tx.execute(
                    "INSERT INTO publication_likes (publication_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![pid, uid, ts(now)],
                )?;
                true
            };

            let like_count: u32 = tx.query_row(
                "SELECT COUNT(*) FROM publication_likes WHERE publication_id = ?1",
                [&pid],
                |row| row.get(0),
            )?;

            // Read before commit so nothing after it can fail the request
            let liker = snapshot_for(&tx, user_id)?.display_name;

            tx.commit()?;
            Ok((publication, liked, like_count, liker))
        })?;

        let notification = if liked {
            self.notify_best_effort(
                NewNotification {
                    recipient_id: publication.author_id,
                    sender_id: user_id,
                    kind: NotificationKind::PublicationLike,
                    title: format!("A {liker} le gusta tu publicación"),
                    body: publication.title.clone(),
                    link: format!("/publicaciones/{}", publication.id),
                },
                now,
            )
        } else {
            None
        };

        Ok(LikeToggled {
            liked,
            like_count,
            notification,
        })
    }
}

/// Author of a publication, if it exists.
pub(super) fn publication_author(conn: &Connection, id: Uuid) -> Result<Option<Uuid>> {
    Ok(query_publication(conn, id)?.map(|p| p.author_id))
}

fn query_publication(conn: &Connection, id: Uuid) -> Result<Option<Publication>> {
    let row = conn
        .query_row(
            "SELECT p.id, p.author_id, p.title, p.body,
                    (SELECT COUNT(*) FROM publication_likes l WHERE l.publication_id = p.id),
                    p.created_at
             FROM publications p WHERE p.id = ?1",
            [id.to_string()],
            |row| {
                Ok(PublicationRow {
                    id: row.get(0)?,
                    author_id: row.get(1)?,
                    title: row.get(2)?,
                    body: row.get(3)?,
                    like_count: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .optional()?;

    row.map(PublicationRow::into_publication).transpose()
}
