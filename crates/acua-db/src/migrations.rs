use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            user_id         TEXT PRIMARY KEY,
            display_name    TEXT NOT NULL,
            avatar_url      TEXT,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS conversations (
            id                  TEXT PRIMARY KEY,
            participant_key     TEXT NOT NULL UNIQUE,
            participant_low     TEXT NOT NULL,
            participant_high    TEXT NOT NULL,
            last_message_text   TEXT,
            last_message_sender TEXT,
            last_message_at     TEXT,
            created_at          TEXT NOT NULL
        );

        -- One row per participant: display snapshot + unread counter
        CREATE TABLE IF NOT EXISTS conversation_members (
            conversation_id TEXT NOT NULL REFERENCES conversations(id),
            user_id         TEXT NOT NULL,
            display_name    TEXT NOT NULL,
            avatar_url      TEXT,
            unread_count    INTEGER NOT NULL DEFAULT 0 CHECK (unread_count >= 0),
            PRIMARY KEY (conversation_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_members_user
            ON conversation_members(user_id);

        CREATE TABLE IF NOT EXISTS messages (
            seq             INTEGER PRIMARY KEY AUTOINCREMENT,
            id              TEXT NOT NULL UNIQUE,
            conversation_id TEXT NOT NULL REFERENCES conversations(id),
            sender_id       TEXT NOT NULL,
            payload         TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at, seq);

        CREATE TABLE IF NOT EXISTS notifications (
            id              TEXT PRIMARY KEY,
            recipient_id    TEXT NOT NULL,
            kind            TEXT NOT NULL,
            title           TEXT NOT NULL,
            body            TEXT NOT NULL,
            link            TEXT NOT NULL,
            is_read         INTEGER NOT NULL DEFAULT 0,
            sender_id       TEXT NOT NULL,
            sender_name     TEXT NOT NULL,
            sender_avatar   TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_recipient
            ON notifications(recipient_id, is_read, created_at);

        CREATE TABLE IF NOT EXISTS publications (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL,
            title       TEXT NOT NULL,
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS publication_likes (
            publication_id  TEXT NOT NULL REFERENCES publications(id),
            user_id         TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            PRIMARY KEY (publication_id, user_id)
        );

        -- The poll lives inside the post row as a JSON document
        CREATE TABLE IF NOT EXISTS forum_posts (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL,
            title       TEXT NOT NULL,
            body        TEXT NOT NULL,
            poll        TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS comments (
            seq         INTEGER PRIMARY KEY AUTOINCREMENT,
            id          TEXT NOT NULL UNIQUE,
            target_kind TEXT NOT NULL,
            target_id   TEXT NOT NULL,
            author_id   TEXT NOT NULL,
            author_name TEXT NOT NULL,
            parent_id   TEXT,
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_target
            ON comments(target_kind, target_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
