use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use acua_types::models::{DEFAULT_DISPLAY_NAME, ParticipantSnapshot, Profile};

use super::{OptionalExt, required_text};
use crate::models::{ProfileRow, ts};
use crate::{Database, Result};

const MAX_DISPLAY_NAME: usize = 80;

impl Database {
    pub fn upsert_profile(
        &self,
        user_id: Uuid,
        display_name: &str,
        avatar_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Profile> {
        let display_name = required_text("display name", display_name, MAX_DISPLAY_NAME)?;
        let avatar_url = avatar_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (user_id, display_name, avatar_url, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                    display_name = excluded.display_name,
                    avatar_url = excluded.avatar_url,
                    updated_at = excluded.updated_at",
                rusqlite::params![user_id.to_string(), display_name, avatar_url, ts(now)],
            )?;
            Ok(())
        })?;

        Ok(Profile {
            user_id,
            display_name,
            avatar_url,
            updated_at: now,
        })
    }

    pub fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.with_conn(|conn| query_profile(conn, user_id))
    }
}

fn query_profile(conn: &Connection, user_id: Uuid) -> Result<Option<Profile>> {
    let row = conn
        .query_row(
            "SELECT user_id, display_name, avatar_url, updated_at FROM profiles WHERE user_id = ?1",
            [user_id.to_string()],
            |row| {
                Ok(ProfileRow {
                    user_id: row.get(0)?,
                    display_name: row.get(1)?,
                    avatar_url: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            },
        )
        .optional()?;

    row.map(ProfileRow::into_profile).transpose()
}

/// Current display fields of a user, falling back to a placeholder when the
/// user never saved a profile.
pub(crate) fn snapshot_for(conn: &Connection, user_id: Uuid) -> Result<ParticipantSnapshot> {
    Ok(match query_profile(conn, user_id)? {
        Some(profile) => ParticipantSnapshot {
            user_id,
            display_name: profile.display_name,
            avatar_url: profile.avatar_url,
        },
        None => ParticipantSnapshot {
            user_id,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            avatar_url: None,
        },
    })
}
