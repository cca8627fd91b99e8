//! Test doubles shared with dependent crates (feature `testing`)

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{
    AccessLogEntry, AccessLogKey, AuthSession, NewIdentity, Page, PagePermission, Profile, Role,
    Session,
};
use crate::storage::{AuthProvider, DataStore, Database, SqliteBackend};

/// SQLite backend over a fresh in-memory database, 8 hour sessions
pub fn memory_backend() -> SqliteBackend {
    let db = Database::open_in_memory().expect("in-memory database");
    SqliteBackend::new(db, Duration::hours(8))
}

/// Hand-driven clock
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Backend operations as seen by [`RecordingBackend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    CreateIdentity,
    SignIn,
    SignOut,
    FetchProfile,
    FindProfileByEmail,
    FetchActiveSession,
    InsertAccessLog,
    CloseAccessLog,
    FetchLatestRole,
    UpdateRole,
    ListPages,
    ListGrantedPages,
    InsertPagePermissions,
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::CreateIdentity
                | Call::SignOut
                | Call::InsertAccessLog
                | Call::CloseAccessLog
                | Call::UpdateRole
                | Call::InsertPagePermissions
        )
    }
}

/// Wraps a backend, records every call in order and fails chosen calls
pub struct RecordingBackend<B> {
    inner: B,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashSet<Call>>,
    permission_rows: Mutex<usize>,
}

impl<B> RecordingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashSet::new()),
            permission_rows: Mutex::new(0),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Make every later `call` fail
    pub fn fail_on(&self, call: Call) {
        self.failures.lock().unwrap().insert(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn count(&self, call: Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    /// Permission rows handed to the inner backend
    pub fn permission_rows(&self) -> usize {
        *self.permission_rows.lock().unwrap()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
        *self.permission_rows.lock().unwrap() = 0;
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failures.lock().unwrap().contains(&call) {
            return Err(Error::InvalidOperation(format!("injected failure: {call:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl<B: AuthProvider> AuthProvider for RecordingBackend<B> {
    async fn create_identity(&self, identity: &NewIdentity) -> Result<Uuid> {
        self.record(Call::CreateIdentity)?;
        self.inner.create_identity(identity).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        self.record(Call::SignIn)?;
        self.inner.sign_in(email, password).await
    }

    async fn sign_out(&self, session_id: Uuid) -> Result<()> {
        self.record(Call::SignOut)?;
        self.inner.sign_out(session_id).await
    }
}

#[async_trait]
impl<B: DataStore> DataStore for RecordingBackend<B> {
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
        self.record(Call::FetchProfile)?;
        self.inner.fetch_profile(user_id).await
    }

    async fn find_profile_by_email(&self, email: &str) -> Result<Option<Uuid>> {
        self.record(Call::FindProfileByEmail)?;
        self.inner.find_profile_by_email(email).await
    }

    async fn fetch_active_session(&self, user_id: Uuid) -> Result<Option<Session>> {
        self.record(Call::FetchActiveSession)?;
        self.inner.fetch_active_session(user_id).await
    }

    async fn insert_access_log(&self, entry: &AccessLogEntry) -> Result<()> {
        self.record(Call::InsertAccessLog)?;
        self.inner.insert_access_log(entry).await
    }

    async fn close_access_log(
        &self,
        key: &AccessLogKey,
        exit_time: DateTime<Utc>,
        duration_seconds: i64,
    ) -> Result<()> {
        self.record(Call::CloseAccessLog)?;
        self.inner
            .close_access_log(key, exit_time, duration_seconds)
            .await
    }

    async fn fetch_latest_role(&self, user_id: Uuid) -> Result<Option<Role>> {
        self.record(Call::FetchLatestRole)?;
        self.inner.fetch_latest_role(user_id).await
    }

    async fn update_role(&self, user_id: Uuid, role: Role) -> Result<()> {
        self.record(Call::UpdateRole)?;
        self.inner.update_role(user_id, role).await
    }

    async fn list_pages(&self) -> Result<Vec<Page>> {
        self.record(Call::ListPages)?;
        self.inner.list_pages().await
    }

    async fn list_granted_pages(&self, user_id: Uuid) -> Result<Vec<Page>> {
        self.record(Call::ListGrantedPages)?;
        self.inner.list_granted_pages(user_id).await
    }

    async fn insert_page_permissions(&self, permissions: &[PagePermission]) -> Result<()> {
        self.record(Call::InsertPagePermissions)?;
        *self.permission_rows.lock().unwrap() += permissions.len();
        self.inner.insert_page_permissions(permissions).await
    }
}
