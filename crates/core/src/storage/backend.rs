//! Embedded backend
//!
//! Implements the backend traits on top of a local SQLite [`Database`].

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::identities::{hash_password, verify_password};
use super::traits::{AuthProvider, DataStore};
use super::Database;
use crate::clock::{Clock, SystemClock};
use crate::error::{Error, Result};
use crate::invariants::assert_session_invariants;
use crate::models::{
    AccessLogEntry, AccessLogKey, AuthSession, AuthUser, Identity, NewIdentity, Page,
    PagePermission, Profile, Role, Session,
};

pub struct SqliteBackend {
    db: Mutex<Database>,
    session_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SqliteBackend {
    pub fn new(db: Database, session_ttl: Duration) -> Self {
        Self {
            db: Mutex::new(db),
            session_ttl,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for session timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run `f` with the database locked
    pub fn with_db<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let db = match self.db.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Database mutex poisoned, recovering");
                poisoned.into_inner()
            }
        };
        f(&db)
    }

    /// Add a page to the catalogue unless its route exists
    pub fn seed_page(&self, page: &Page) -> Result<bool> {
        self.with_db(|db| db.pages().create(page))
    }

    /// Make sure an administrator account exists; returns its id
    #[instrument(skip(self, password))]
    pub fn ensure_admin(&self, email: &str, password: &str, full_name: &str) -> Result<Uuid> {
        let existing = self.with_db(|db| db.identities().find_by_email(email))?;
        let user_id = match existing {
            Some(identity) => identity.id,
            None => {
                let identity = Identity {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    password_hash: hash_password(password)?,
                    display_name: full_name.to_string(),
                    created_at: self.clock.now(),
                };
                self.with_db(|db| db.identities().create(&identity))?;
                info!(user_id = %identity.id, "Created bootstrap administrator");
                identity.id
            }
        };

        self.with_db(|db| db.roles().update_all(user_id, Role::Admin))?;
        Ok(user_id)
    }

    /// Deactivate sessions whose expiry has passed
    pub fn expire_stale_sessions(&self) -> Result<u64> {
        let now = self.clock.now();
        self.with_db(|db| db.sessions().deactivate_expired(now))
    }
}

#[async_trait]
impl AuthProvider for SqliteBackend {
    #[instrument(skip(self, identity), fields(email = %identity.email))]
    async fn create_identity(&self, identity: &NewIdentity) -> Result<Uuid> {
        let record = Identity {
            id: Uuid::new_v4(),
            email: identity.email.clone(),
            password_hash: hash_password(&identity.password)?,
            display_name: identity.display_name.clone(),
            created_at: self.clock.now(),
        };
        self.with_db(|db| db.identities().create(&record))?;
        Ok(record.id)
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let identity = self
            .with_db(|db| db.identities().find_by_email(email))?
            .ok_or_else(|| Error::Authentication("invalid credentials".to_string()))?;

        if !verify_password(password, &identity.password_hash)? {
            return Err(Error::Authentication("invalid credentials".to_string()));
        }

        let session = Session::start(identity.id, self.clock.now(), self.session_ttl)?;
        self.with_db(|db| db.sessions().create(&session))?;
        info!(user_id = %identity.id, session_id = %session.id, "Signed in");

        Ok(AuthSession {
            user: AuthUser {
                id: identity.id,
                email: identity.email,
            },
            session,
        })
    }

    #[instrument(skip(self))]
    async fn sign_out(&self, session_id: Uuid) -> Result<()> {
        if !self.with_db(|db| db.sessions().deactivate(session_id))? {
            debug!(%session_id, "Session already inactive");
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for SqliteBackend {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.with_db(|db| db.profiles().find_by_id(user_id))
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        self.with_db(|db| db.profiles().find_id_by_email(email))
    }

    async fn fetch_active_session(&self, user_id: Uuid) -> Result<Option<Session>> {
        let session = self.with_db(|db| db.sessions().find_latest_active(user_id))?;
        if let Some(session) = &session {
            assert_session_invariants(session);
        }
        Ok(session)
    }

    async fn insert_access_log(&self, entry: &AccessLogEntry) -> Result<()> {
        self.with_db(|db| db.access_logs().insert(entry))
    }

    async fn close_access_log(
        &self,
        key: &AccessLogKey,
        exit_time: DateTime<Utc>,
        duration_seconds: i64,
    ) -> Result<()> {
        let changed =
            self.with_db(|db| db.access_logs().close(key, exit_time, duration_seconds))?;
        if changed == 0 {
            return Err(Error::NotFound(format!(
                "access log for {} at {}",
                key.page_path, key.entry_time
            )));
        }
        Ok(())
    }

    async fn fetch_latest_role(&self, user_id: Uuid) -> Result<Option<Role>> {
        self.with_db(|db| db.roles().latest(user_id))
    }

    async fn update_role(&self, user_id: Uuid, role: Role) -> Result<()> {
        let changed = self.with_db(|db| db.roles().update_all(user_id, role))?;
        if changed == 0 {
            return Err(Error::NotFound(format!("role rows for user {user_id}")));
        }
        Ok(())
    }

    async fn list_pages(&self) -> Result<Vec<Page>> {
        self.with_db(|db| db.pages().list())
    }

    async fn list_granted_pages(&self, user_id: Uuid) -> Result<Vec<Page>> {
        self.with_db(|db| db.pages().list_for_user(user_id))
    }

    async fn insert_page_permissions(&self, permissions: &[PagePermission]) -> Result<()> {
        self.with_db(|db| db.pages().grant_all(permissions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SqliteBackend {
        SqliteBackend::new(Database::open_in_memory().unwrap(), Duration::hours(8))
    }

    fn new_identity(email: &str) -> NewIdentity {
        NewIdentity {
            email: email.to_string(),
            password: "segredo1".to_string(),
            display_name: "Ana Lima".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sign_in_opens_session() {
        let backend = backend();
        let user_id = backend.create_identity(&new_identity("ana@exemplo.com")).await.unwrap();

        let auth = backend.sign_in("ana@exemplo.com", "segredo1").await.unwrap();
        assert_eq!(auth.user.id, user_id);
        assert_eq!(auth.session.expires_at - auth.session.login_time, Duration::hours(8));

        let active = backend.fetch_active_session(user_id).await.unwrap().unwrap();
        assert_eq!(active.id, auth.session.id);
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_credentials() {
        let backend = backend();
        backend.create_identity(&new_identity("ana@exemplo.com")).await.unwrap();

        let wrong_password = backend.sign_in("ana@exemplo.com", "errada").await;
        assert!(matches!(wrong_password, Err(Error::Authentication(_))));

        let unknown = backend.sign_in("ninguem@exemplo.com", "segredo1").await;
        assert!(matches!(unknown, Err(Error::Authentication(_))));
    }

    #[tokio::test]
    async fn test_sign_out_deactivates_session() {
        let backend = backend();
        let user_id = backend.create_identity(&new_identity("ana@exemplo.com")).await.unwrap();
        let auth = backend.sign_in("ana@exemplo.com", "segredo1").await.unwrap();

        backend.sign_out(auth.session.id).await.unwrap();
        backend.sign_out(auth.session.id).await.unwrap();
        assert!(backend.fetch_active_session(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_role_for_unknown_user_fails() {
        let backend = backend();
        let result = backend.update_role(Uuid::new_v4(), Role::AnalystII).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let backend = backend();
        let first = backend.ensure_admin("admin@exemplo.com", "segredo1", "Admin").unwrap();
        let second = backend.ensure_admin("admin@exemplo.com", "outra", "Admin").unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.fetch_latest_role(first).await.unwrap(), Some(Role::Admin));
    }
}
