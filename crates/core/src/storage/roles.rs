//! Role storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{format_datetime, parse_role, OptionalExt};
use crate::error::Result;
use crate::models::Role;

pub struct RoleStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoleStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append a role row
    pub fn insert(&self, user_id: Uuid, role: Role, created_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO user_roles (id, user_id, role, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                Uuid::new_v4().to_string(),
                user_id.to_string(),
                role.as_str(),
                format_datetime(&created_at),
            ],
        )?;
        Ok(())
    }

    /// Effective role: the newest row by creation time
    #[instrument(skip(self))]
    pub fn latest(&self, user_id: Uuid) -> Result<Option<Role>> {
        let role = self
            .conn
            .query_row(
                "SELECT role FROM user_roles WHERE user_id = ?1
                 ORDER BY created_at DESC LIMIT 1",
                params![user_id.to_string()],
                |row| parse_role(&row.get::<_, String>(0)?),
            )
            .optional()?;

        Ok(role)
    }

    /// Overwrite every role row of a user; returns rows changed
    #[instrument(skip(self))]
    pub fn update_all(&self, user_id: Uuid, role: Role) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE user_roles SET role = ?1 WHERE user_id = ?2",
            params![role.as_str(), user_id.to_string()],
        )?;
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::create_test_identity;
    use crate::storage::Database;
    use chrono::Duration;

    #[test]
    fn test_newest_role_governs() {
        let db = Database::open_in_memory().unwrap();
        let user_id = create_test_identity(&db, "ana@exemplo.com");
        let later = Utc::now() + Duration::seconds(5);

        db.roles().insert(user_id, Role::Admin, later).unwrap();
        assert_eq!(db.roles().latest(user_id).unwrap(), Some(Role::Admin));
    }

    #[test]
    fn test_update_all_rewrites_rows() {
        let db = Database::open_in_memory().unwrap();
        let user_id = create_test_identity(&db, "ana@exemplo.com");

        assert_eq!(db.roles().update_all(user_id, Role::AnalystIII).unwrap(), 1);
        assert_eq!(db.roles().latest(user_id).unwrap(), Some(Role::AnalystIII));
    }

    #[test]
    fn test_no_role_rows() {
        let db = Database::open_in_memory().unwrap();
        let stranger = Uuid::new_v4();

        assert_eq!(db.roles().latest(stranger).unwrap(), None);
        assert_eq!(db.roles().update_all(stranger, Role::AnalystII).unwrap(), 0);
    }
}
