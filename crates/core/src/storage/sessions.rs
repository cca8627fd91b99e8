//! Session storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{format_datetime, parse_datetime, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::Session;

pub struct SessionStore<'a> {
    conn: &'a Connection,
}

impl<'a> SessionStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a session
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub fn create(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_sessions (id, user_id, login_time, expires_at, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id.to_string(),
                session.user_id.to_string(),
                format_datetime(&session.login_time),
                format_datetime(&session.expires_at),
                session.is_active,
            ],
        )?;
        Ok(())
    }

    /// Most recent active session for a user, by login time
    #[instrument(skip(self))]
    pub fn find_latest_active(&self, user_id: Uuid) -> Result<Option<Session>> {
        let session = self
            .conn
            .query_row(
                "SELECT id, user_id, login_time, expires_at, is_active FROM user_sessions
                 WHERE user_id = ?1 AND is_active = 1
                 ORDER BY login_time DESC LIMIT 1",
                params![user_id.to_string()],
                |row| {
                    Ok(Session {
                        id: parse_uuid(&row.get::<_, String>(0)?)?,
                        user_id: parse_uuid(&row.get::<_, String>(1)?)?,
                        login_time: parse_datetime(&row.get::<_, String>(2)?)?,
                        expires_at: parse_datetime(&row.get::<_, String>(3)?)?,
                        is_active: row.get(4)?,
                    })
                },
            )
            .optional()?;

        Ok(session)
    }

    /// Mark a session inactive; returns whether a live row was changed
    pub fn deactivate(&self, session_id: Uuid) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE user_sessions SET is_active = 0 WHERE id = ?1 AND is_active = 1",
            params![session_id.to_string()],
        )?;
        Ok(changed > 0)
    }

    /// Deactivate sessions already past expiry
    pub fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let count = self.conn.execute(
            "UPDATE user_sessions SET is_active = 0 WHERE is_active = 1 AND expires_at <= ?1",
            params![format_datetime(&now)],
        )?;
        Ok(count as u64)
    }
}
