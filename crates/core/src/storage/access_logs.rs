//! Access-log storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{format_datetime, parse_datetime, parse_datetime_opt, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::{AccessLogEntry, AccessLogKey};

pub struct AccessLogStore<'a> {
    conn: &'a Connection,
}

impl<'a> AccessLogStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Open a visit row
    #[instrument(skip(self, entry), fields(user_id = %entry.user_id, page = %entry.page_path))]
    pub fn insert(&self, entry: &AccessLogEntry) -> Result<()> {
        self.conn.execute(
            "INSERT INTO access_logs (id, user_id, page_path, entry_time, exit_time, duration_seconds)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                entry.user_id.to_string(),
                entry.page_path,
                format_datetime(&entry.entry_time),
                entry.exit_time.as_ref().map(format_datetime),
                entry.duration_seconds,
            ],
        )?;
        Ok(())
    }

    /// Close the visit rows matching `key`; returns rows changed
    #[instrument(skip(self, key), fields(user_id = %key.user_id, page = %key.page_path))]
    pub fn close(
        &self,
        key: &AccessLogKey,
        exit_time: DateTime<Utc>,
        duration_seconds: i64,
    ) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE access_logs SET exit_time = ?1, duration_seconds = ?2
             WHERE user_id = ?3 AND page_path = ?4 AND entry_time = ?5",
            params![
                format_datetime(&exit_time),
                duration_seconds,
                key.user_id.to_string(),
                key.page_path,
                format_datetime(&key.entry_time),
            ],
        )?;
        Ok(changed)
    }

    /// Fetch the visit row matching `key`
    pub fn find(&self, key: &AccessLogKey) -> Result<Option<AccessLogEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT user_id, page_path, entry_time, exit_time, duration_seconds FROM access_logs
                 WHERE user_id = ?1 AND page_path = ?2 AND entry_time = ?3",
                params![
                    key.user_id.to_string(),
                    key.page_path,
                    format_datetime(&key.entry_time),
                ],
                |row| {
                    Ok(AccessLogEntry {
                        user_id: parse_uuid(&row.get::<_, String>(0)?)?,
                        page_path: row.get(1)?,
                        entry_time: parse_datetime(&row.get::<_, String>(2)?)?,
                        exit_time: parse_datetime_opt(row.get(3)?)?,
                        duration_seconds: row.get(4)?,
                    })
                },
            )
            .optional()?;

        Ok(entry)
    }

    /// Number of visits still open for a user
    pub fn count_open(&self, user_id: Uuid) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM access_logs WHERE user_id = ?1 AND exit_time IS NULL",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
