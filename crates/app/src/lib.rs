//! Gestor application layer
//!
//! Configuration, the signed-in session, the session countdown, page visit
//! logging and the view models for each screen.

pub mod access_logger;
pub mod config;
pub mod session_timer;
pub mod state;
pub mod viewmodel;

#[cfg(test)]
mod test_support;

pub use access_logger::{AccessLogger, PageVisit};
pub use config::AppConfig;
pub use session_timer::{format_remaining, Countdown, ExpiryHandler, SessionTimer, TimerHandle};
pub use state::{AppState, SessionContext};
