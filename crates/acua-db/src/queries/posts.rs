use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use acua_types::models::ForumPost;
use acua_types::poll::{NewPoll, Poll, VoteError, VoteOutcome};

use super::{OptionalExt, required_text};
use crate::models::{PostRow, parse_id, parse_ts, ts};
use crate::{Database, Result, StoreError};

const MAX_TITLE: usize = 200;
const MAX_BODY: usize = 20_000;

impl Database {
    pub fn create_post(
        &self,
        author_id: Uuid,
        title: &str,
        body: &str,
        poll: Option<NewPoll>,
        now: DateTime<Utc>,
    ) -> Result<ForumPost> {
        let title = required_text("title", title, MAX_TITLE)?;
        let body = required_text("body", body, MAX_BODY)?;
        let poll = poll
            .map(|def| Poll::new(def, now))
            .transpose()
            .map_err(|e| StoreError::invalid(e.to_string()))?;
        let encoded = poll.as_ref().map(serde_json::to_string).transpose()?;

        let post = ForumPost {
            id: Uuid::new_v4(),
            author_id,
            title,
            body,
            poll,
            created_at: now,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO forum_posts (id, author_id, title, body, poll, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    post.id.to_string(),
                    author_id.to_string(),
                    post.title,
                    post.body,
                    encoded,
                    ts(now),
                ],
            )?;
            Ok(())
        })?;

        Ok(post)
    }

    pub fn get_post(&self, id: Uuid) -> Result<Option<ForumPost>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Guarded read-modify-write of the poll embedded in a post.
    ///
    /// Expiry is re-checked against `now` inside the transaction, so a vote
    /// that raced the deadline on the client is still refused. Re-selecting
    /// the current option commits nothing.
    pub fn cast_vote(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        option_index: usize,
        now: DateTime<Utc>,
    ) -> Result<(Poll, VoteOutcome)> {
        let pid = post_id.to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let stored: Option<Option<String>> = tx
                .query_row("SELECT poll FROM forum_posts WHERE id = ?1", [&pid], |row| row.get(0))
                .optional()?;
            let raw = stored
                .ok_or(StoreError::NotFound("post"))?
                .ok_or(StoreError::NotFound("poll"))?;
            let mut poll: Poll = serde_json::from_str(&raw)?;

            let outcome = poll
                .cast_vote(user_id, option_index, now)
                .map_err(|e| match e {
                    VoteError::Ended => StoreError::PollEnded,
                    e @ VoteError::InvalidOption { .. } => StoreError::invalid(e.to_string()),
                })?;

            if outcome.mutated() {
                tx.execute(
                    "UPDATE forum_posts SET poll = ?2 WHERE id = ?1",
                    rusqlite::params![pid, serde_json::to_string(&poll)?],
                )?;
            }
            tx.commit()?;

            debug!("Vote on {} by {}: {:?}", pid, user_id, outcome);
            Ok((poll, outcome))
        })
    }
}

/// Author of a forum post, if it exists.
pub(super) fn post_author(conn: &Connection, id: Uuid) -> Result<Option<Uuid>> {
    let author: Option<String> = conn
        .query_row(
            "SELECT author_id FROM forum_posts WHERE id = ?1",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    author.as_deref().map(parse_id).transpose()
}

fn query_post(conn: &Connection, id: Uuid) -> Result<Option<ForumPost>> {
    let row = conn
        .query_row(
            "SELECT id, author_id, title, body, poll, created_at FROM forum_posts WHERE id = ?1",
            [id.to_string()],
            |row| {
                Ok(PostRow {
                    id: row.get(0)?,
                    author_id: row.get(1)?,
                    title: row.get(2)?,
                    body: row.get(3)?,
                    poll: row.get(4)?,
                    created_at: row.get(5)?,
                })
            },
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };

    Ok(Some(ForumPost {
        id: parse_id(&row.id)?,
        author_id: parse_id(&row.author_id)?,
        title: row.title,
        body: row.body,
        poll: row.poll.as_deref().map(serde_json::from_str).transpose()?,
        created_at: parse_ts(&row.created_at)?,
    }))
}
