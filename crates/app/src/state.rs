//! Application state and the signed-in session

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use directories::ProjectDirs;
use gestor_core::{
    AuthProvider, AuthSession, AuthUser, Backend, Clock, Database, Error, Result, SqliteBackend,
    SystemClock,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::session_timer::ExpiryHandler;

/// Shared services handed to every view model
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub clock: Arc<dyn Clock>,
    pub config: AppConfig,
}

impl AppState {
    /// Open the store and seed the configured bootstrap data
    pub fn new(config: AppConfig) -> Result<Self> {
        let db_path = match &config.database_path {
            Some(path) => path.clone(),
            None => Self::data_path()?.join("gestor.db"),
        };

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        info!(path = %db_path.display(), "Opened database");

        let backend = SqliteBackend::new(db, config.session_ttl());
        let expired = backend.expire_stale_sessions()?;
        if expired > 0 {
            info!(count = expired, "Deactivated expired sessions");
        }
        seed(&backend, &config)?;

        Ok(Self::from_parts(
            Arc::new(backend),
            Arc::new(SystemClock),
            config,
        ))
    }

    pub fn from_parts(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>, config: AppConfig) -> Self {
        Self {
            backend,
            clock,
            config,
        }
    }

    fn data_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "gestor", "gestor").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;

        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Create the bootstrap administrator and page catalogue
pub fn seed(backend: &SqliteBackend, config: &AppConfig) -> Result<()> {
    let Some(bootstrap) = &config.bootstrap else {
        return Ok(());
    };

    if let Some(admin) = &bootstrap.admin {
        backend.ensure_admin(&admin.email, &admin.password, &admin.full_name)?;
    }

    for seed in &bootstrap.pages {
        if backend.seed_page(&seed.to_page())? {
            info!(route = %seed.route, "Seeded page");
        }
    }
    Ok(())
}

/// Who is signed in. Filled by `sign_in`, emptied by `sign_out`.
pub struct SessionContext {
    backend: Arc<dyn Backend>,
    current: Mutex<Option<AuthSession>>,
    signed_in: watch::Sender<bool>,
}

impl SessionContext {
    pub fn new(backend: Arc<dyn Backend>) -> Arc<Self> {
        let (signed_in, _) = watch::channel(false);
        Arc::new(Self {
            backend,
            current: Mutex::new(None),
            signed_in,
        })
    }

    fn current(&self) -> MutexGuard<'_, Option<AuthSession>> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Session context mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser> {
        let auth = self.backend.sign_in(email, password).await?;
        let user = auth.user.clone();

        let previous = self.current().replace(auth);
        if let Some(previous) = previous {
            // Only one session per context
            if let Err(e) = self.backend.sign_out(previous.session.id).await {
                warn!(session_id = %previous.session.id, error = %e, "Failed to close previous session");
            }
        }

        self.signed_in.send_replace(true);
        Ok(user)
    }

    /// End the current session; does nothing when signed out
    pub async fn sign_out(&self) -> Result<()> {
        let Some(auth) = self.current().take() else {
            return Ok(());
        };
        self.end(auth).await
    }

    /// End `session_id` only if it is still the current session.
    ///
    /// Returns false when another sign-in replaced it (or nobody is signed in).
    pub async fn sign_out_session(&self, session_id: Uuid) -> Result<bool> {
        let auth = {
            let mut current = self.current();
            let is_current = current
                .as_ref()
                .is_some_and(|auth| auth.session.id == session_id);
            if is_current {
                current.take()
            } else {
                None
            }
        };

        match auth {
            Some(auth) => {
                self.end(auth).await?;
                Ok(true)
            }
            None => {
                debug!(%session_id, "Session is no longer current");
                Ok(false)
            }
        }
    }

    async fn end(&self, auth: AuthSession) -> Result<()> {
        self.signed_in.send_replace(false);

        info!(user_id = %auth.user.id, session_id = %auth.session.id, "Signing out");
        self.backend.sign_out(auth.session.id).await
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.current().as_ref().map(|auth| auth.user.clone())
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.current().as_ref().map(|auth| auth.session.id)
    }

    pub fn is_signed_in(&self) -> bool {
        self.current().is_some()
    }

    /// Follows sign-in state changes
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.signed_in.subscribe()
    }
}

#[async_trait]
impl ExpiryHandler for SessionContext {
    async fn on_expired(&self, session_id: Uuid) {
        if let Err(e) = self.sign_out_session(session_id).await {
            warn!(error = %e, "Sign-out after expiry failed");
        }
    }
}
