//! Header: identity, login time and the session countdown

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use gestor_core::{AuthUser, DataStore, Profile, Session};
use tokio::sync::watch;
use tracing::warn;

use crate::session_timer::{SessionTimer, TimerHandle};
use crate::state::{AppState, SessionContext};

/// What the header renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderView {
    pub full_name: String,
    pub email: String,
    pub initials: String,
    pub avatar_url: Option<String>,
    /// `HH:mm`, absent without an active session
    pub login_time: Option<String>,
    /// Countdown text, absent without an active session
    pub time_remaining: Option<String>,
}

pub fn format_login_time<Tz: TimeZone>(login_time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    login_time.format("%H:%M").to_string()
}

pub struct Header {
    user: Option<AuthUser>,
    profile: Option<Profile>,
    session: Option<Session>,
    timer: Option<TimerHandle>,
}

impl Header {
    /// Load profile and session together and start the countdown
    pub async fn mount(state: &AppState, ctx: &Arc<SessionContext>) -> Self {
        let Some(user) = ctx.user() else {
            return Self {
                user: None,
                profile: None,
                session: None,
                timer: None,
            };
        };

        let (profile, session) = tokio::join!(
            state.backend.fetch_profile(user.id),
            state.backend.fetch_active_session(user.id),
        );

        let profile = profile.unwrap_or_else(|e| {
            warn!(user_id = %user.id, error = %e, "Failed to load profile");
            None
        });
        let session = session.unwrap_or_else(|e| {
            warn!(user_id = %user.id, error = %e, "Failed to load session");
            None
        });

        let timer = session.as_ref().map(|session| {
            SessionTimer::start(
                session,
                state.config.timer_interval(),
                state.clock.clone(),
                ctx.clone(),
            )
        });

        Self {
            user: Some(user),
            profile,
            session,
            timer,
        }
    }

    /// Nothing to show until both user and profile are known
    pub fn view(&self) -> Option<HeaderView> {
        let user = self.user.as_ref()?;
        let profile = self.profile.as_ref()?;

        Some(HeaderView {
            full_name: profile.full_name.clone(),
            email: user.email.clone(),
            initials: profile.initials(),
            avatar_url: profile.avatar_url.clone(),
            login_time: self
                .session
                .as_ref()
                .map(|s| format_login_time(&s.login_time.with_timezone(&Local))),
            time_remaining: self.timer.as_ref().map(TimerHandle::display),
        })
    }

    /// Countdown updates, when a timer is running
    pub fn countdown(&self) -> Option<watch::Receiver<String>> {
        self.timer.as_ref().map(TimerHandle::subscribe)
    }

    /// Stop the countdown
    pub async fn unmount(self) {
        if let Some(timer) = self.timer {
            timer.cancel().await;
        }
    }
}
