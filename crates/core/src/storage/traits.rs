//! Backend collaborator traits
//!
//! The view layer talks to auth and data only through these traits, so the
//! embedded SQLite backend, test doubles, or a remote service can sit behind
//! them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AccessLogEntry, AccessLogKey, AuthSession, NewIdentity, Page, PagePermission, Profile, Role,
    Session,
};

/// Authentication operations
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create an identity (with its profile and default role); returns its id
    async fn create_identity(&self, identity: &NewIdentity) -> Result<Uuid>;

    /// Verify credentials and open a session
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    /// Invalidate a session
    async fn sign_out(&self, session_id: Uuid) -> Result<()>;
}

/// Relational data operations
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Read profile by user id
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>>;

    /// Id of the user whose profile carries this e-mail
    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Uuid>>;

    /// Most recent active session by login time
    async fn fetch_active_session(&self, user_id: Uuid) -> Result<Option<Session>>;

    /// Open an access-log row
    async fn insert_access_log(&self, entry: &AccessLogEntry) -> Result<()>;

    /// Close the access-log row matching `key`
    async fn close_access_log(
        &self,
        key: &AccessLogKey,
        exit_time: DateTime<Utc>,
        duration_seconds: i64,
    ) -> Result<()>;

    /// Most recent role by creation time
    async fn fetch_latest_role(&self, user_id: Uuid) -> Result<Option<Role>>;

    /// Set the role rows of a user
    async fn update_role(&self, user_id: Uuid, role: Role) -> Result<()>;

    /// All pages ordered by name
    async fn list_pages(&self) -> Result<Vec<Page>>;

    /// Pages granted to a user
    async fn list_granted_pages(&self, user_id: Uuid) -> Result<Vec<Page>>;

    /// Bulk-insert page grants
    async fn insert_page_permissions(&self, permissions: &[PagePermission]) -> Result<()>;
}

/// Combined backend interface
pub trait Backend: AuthProvider + DataStore {}

// Blanket implementation: any type implementing both traits is a Backend
impl<T> Backend for T where T: AuthProvider + DataStore {}
