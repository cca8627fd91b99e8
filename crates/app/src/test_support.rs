//! Shared fixtures for the app tests

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use gestor_core::testing::{ManualClock, RecordingBackend};
use gestor_core::{AuthProvider, Database, NewIdentity, Page, SqliteBackend};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::state::{AppState, SessionContext};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ANALYST_EMAIL: &str = "ana@example.com";
pub const PASSWORD: &str = "secret1";

pub struct Fixture {
    pub recording: Arc<RecordingBackend<SqliteBackend>>,
    pub clock: ManualClock,
    pub state: AppState,
    pub ctx: Arc<SessionContext>,
    pub analyst_id: Uuid,
    pub pages: Vec<Page>,
}

pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
}

/// Store with an administrator, one analyst and two pages; clock at 09:00
pub async fn fixture(session_ttl: Duration) -> Fixture {
    let clock = ManualClock::new(at(9, 0));
    let backend = SqliteBackend::new(Database::open_in_memory().unwrap(), session_ttl)
        .with_clock(Arc::new(clock.clone()));

    backend.ensure_admin(ADMIN_EMAIL, PASSWORD, "Ana Admin").unwrap();
    let analyst_id = backend
        .create_identity(&NewIdentity {
            email: ANALYST_EMAIL.to_string(),
            password: PASSWORD.to_string(),
            display_name: "Ana Lima".to_string(),
        })
        .await
        .unwrap();

    let pages = vec![
        Page::new("Relatórios", "/reports", None),
        Page::new("Vendas", "/sales", Some("Painel de vendas".to_string())),
    ];
    for page in &pages {
        backend.seed_page(page).unwrap();
    }

    let recording = Arc::new(RecordingBackend::new(backend));
    let config = AppConfig {
        session_ttl_hours: 1,
        ..AppConfig::default()
    };
    let state = AppState::from_parts(recording.clone(), Arc::new(clock.clone()), config);
    let ctx = SessionContext::new(recording.clone());

    Fixture {
        recording,
        clock,
        state,
        ctx,
        analyst_id,
        pages,
    }
}

impl Fixture {
    pub async fn sign_in(&self, email: &str) {
        self.ctx.sign_in(email, PASSWORD).await.unwrap();
        self.recording.clear_calls();
    }
}
