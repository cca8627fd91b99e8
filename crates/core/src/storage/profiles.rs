//! Profile storage operations

use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::Profile;

pub struct ProfileStore<'a> {
    conn: &'a Connection,
}

impl<'a> ProfileStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Find profile by user ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, user_id: Uuid) -> Result<Option<Profile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT full_name, avatar_url FROM profiles WHERE id = ?1",
                params![user_id.to_string()],
                |row| {
                    Ok(Profile {
                        full_name: row.get(0)?,
                        avatar_url: row.get(1)?,
                    })
                },
            )
            .optional()?;

        Ok(profile)
    }

    /// Find the user ID owning a profile e-mail
    #[instrument(skip(self))]
    pub fn find_id_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM profiles WHERE email = ?1",
                params![email],
                |row| parse_uuid(&row.get::<_, String>(0)?),
            )
            .optional()?;

        Ok(id)
    }
}
