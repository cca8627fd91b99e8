//! Session countdown
//!
//! Refreshes a "time left" string from a session's expiry and signs the
//! user out once when it runs out. The task lives as long as its
//! [`TimerHandle`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gestor_core::{Clock, Session};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use uuid::Uuid;

/// Display value once the session is over
pub const EXPIRED: &str = "Expirado";

/// Time left on a session, as shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Remaining { hours: i64, minutes: i64 },
    Expired,
}

impl Countdown {
    pub fn until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::from_remaining(expires_at - now)
    }

    pub fn from_remaining(remaining: chrono::Duration) -> Self {
        if remaining <= chrono::Duration::zero() {
            return Countdown::Expired;
        }
        let secs = remaining.num_seconds();
        Countdown::Remaining {
            hours: secs / 3600,
            minutes: (secs % 3600) / 60,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Countdown::Expired)
    }
}

impl std::fmt::Display for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Countdown::Remaining { hours, minutes } => write!(f, "{}h {}min", hours, minutes),
            Countdown::Expired => f.write_str(EXPIRED),
        }
    }
}

pub fn format_remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    Countdown::until(expires_at, now).to_string()
}

/// Called once when the countdown of `session_id` reaches zero
#[async_trait]
pub trait ExpiryHandler: Send + Sync {
    async fn on_expired(&self, session_id: Uuid);
}

pub struct SessionTimer;

impl SessionTimer {
    /// Spawn the countdown for `session`; the first evaluation runs immediately
    pub fn start(
        session: &Session,
        interval: Duration,
        clock: Arc<dyn Clock>,
        handler: Arc<dyn ExpiryHandler>,
    ) -> TimerHandle {
        let (tx, rx) = watch::channel(String::new());
        let session = session.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let countdown = Countdown::from_remaining(session.remaining_at(clock.now()));
                tx.send_replace(countdown.to_string());

                if countdown.is_expired() {
                    info!(session_id = %session.id, expires_at = %session.expires_at, "Session expired");
                    handler.on_expired(session.id).await;
                    break;
                }
            }
        });

        TimerHandle {
            display: rx,
            task: Some(task),
        }
    }
}

/// Owns the countdown task; dropping it stops the task
pub struct TimerHandle {
    display: watch::Receiver<String>,
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Latest display value (empty before the first tick)
    pub fn display(&self) -> String {
        self.display.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.display.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Stop the task and wait until it is gone
    pub async fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancelled, or already finished
            let _ = task.await;
            debug!("Session timer cancelled");
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
