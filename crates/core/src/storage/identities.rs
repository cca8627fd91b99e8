//! Identity storage operations

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{format_datetime, parse_datetime, parse_uuid, OptionalExt};
use super::roles::RoleStore;
use crate::error::{Error, Result};
use crate::models::{Identity, Role};

/// Metadata blob kept alongside an identity
#[derive(Debug, Serialize, Deserialize)]
struct UserMetadata {
    full_name: String,
}

/// Hash a password with argon2 and a fresh salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check a password against a stored argon2 hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub struct IdentityStore<'a> {
    conn: &'a Connection,
}

impl<'a> IdentityStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create an identity with its profile and a default role row.
    ///
    /// All three rows land together or not at all.
    #[instrument(skip(self, identity), fields(email = %identity.email))]
    pub fn create(&self, identity: &Identity) -> Result<()> {
        if self.find_by_email(&identity.email)?.is_some() {
            return Err(Error::DuplicateEmail(identity.email.clone()));
        }

        let metadata = serde_json::to_string(&UserMetadata {
            full_name: identity.display_name.clone(),
        })?;
        let created_at = format_datetime(&identity.created_at);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO identities (id, email, password_hash, user_metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                identity.id.to_string(),
                identity.email,
                identity.password_hash,
                metadata,
                created_at,
            ],
        )?;
        tx.execute(
            "INSERT INTO profiles (id, email, full_name, avatar_url, created_at)
             VALUES (?1, ?2, ?3, NULL, ?4)",
            params![
                identity.id.to_string(),
                identity.email,
                identity.display_name,
                created_at,
            ],
        )?;
        RoleStore::new(&tx).insert(identity.id, Role::default(), identity.created_at)?;
        tx.commit()?;

        Ok(())
    }

    /// Find identity by e-mail
    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<Identity>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, password_hash, user_metadata, created_at FROM identities WHERE email = ?1",
        )?;

        let row = stmt
            .query_row(params![email], |row| {
                Ok((
                    parse_uuid(&row.get::<_, String>(0)?)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    parse_datetime(&row.get::<_, String>(4)?)?,
                ))
            })
            .optional()?;

        let Some((id, email, password_hash, metadata, created_at)) = row else {
            return Ok(None);
        };
        let metadata: UserMetadata = serde_json::from_str(&metadata)?;

        Ok(Some(Identity {
            id,
            email,
            password_hash,
            display_name: metadata.full_name,
            created_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use chrono::Utc;

    fn identity(email: &str) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash_password("segredo1").unwrap(),
            display_name: "Maria Souza".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("segredo1").unwrap();
        assert!(verify_password("segredo1", &hash).unwrap());
        assert!(!verify_password("outra", &hash).unwrap());
    }

    #[test]
    fn test_create_writes_profile_and_default_role() {
        let db = Database::open_in_memory().unwrap();
        let created = identity("maria@exemplo.com");
        db.identities().create(&created).unwrap();

        let found = db.identities().find_by_email("maria@exemplo.com").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.display_name, "Maria Souza");

        let profile = db.profiles().find_by_id(created.id).unwrap().unwrap();
        assert_eq!(profile.full_name, "Maria Souza");
        assert_eq!(profile.avatar_url, None);

        assert_eq!(db.roles().latest(created.id).unwrap(), Some(Role::AnalystI));
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.identities().create(&identity("maria@exemplo.com")).unwrap();

        let err = db.identities().create(&identity("maria@exemplo.com")).unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail(_)));
    }
}
