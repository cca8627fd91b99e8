//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use uuid::Uuid;

use crate::models::{AccessLogEntry, Session};

/// Validate that a session record is internally consistent
pub fn assert_session_invariants(session: &Session) {
    debug_assert!(
        session.expires_at > session.login_time,
        "Session {} expires at {} before login at {}",
        session.id,
        session.expires_at,
        session.login_time
    );

    debug_assert!(
        session.user_id != Uuid::nil(),
        "Session {} has nil user_id",
        session.id
    );
}

/// Validate that an access-log row is internally consistent
pub fn assert_access_log_invariants(entry: &AccessLogEntry) {
    // Exit and duration are written together
    debug_assert_eq!(
        entry.exit_time.is_some(),
        entry.duration_seconds.is_some(),
        "Access log for {} has exit {:?} but duration {:?}",
        entry.page_path,
        entry.exit_time,
        entry.duration_seconds
    );

    if let Some(duration) = entry.duration_seconds {
        debug_assert!(
            duration >= 0,
            "Access log for {} has negative duration {}",
            entry.page_path,
            duration
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_valid_session_passes() {
        let session = Session::start(Uuid::new_v4(), Utc::now(), Duration::hours(1)).unwrap();
        assert_session_invariants(&session);
    }

    #[test]
    fn test_closed_access_log_passes() {
        let entry_time = Utc::now();
        let mut entry = AccessLogEntry::open(Uuid::new_v4(), "/dashboard", entry_time);
        assert_access_log_invariants(&entry);

        entry.close(entry_time + Duration::seconds(3));
        assert_access_log_invariants(&entry);
    }

    #[test]
    #[should_panic(expected = "expires at")]
    #[cfg(debug_assertions)]
    fn test_inverted_session_panics() {
        let mut session = Session::start(Uuid::new_v4(), Utc::now(), Duration::hours(1)).unwrap();
        session.expires_at = session.login_time - Duration::seconds(1);
        assert_session_invariants(&session);
    }
}
