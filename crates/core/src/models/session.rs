//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// A bounded-lifetime authentication grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub login_time: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Session {
    /// Open a new active session lasting `ttl` from `login_time`
    pub fn start(user_id: Uuid, login_time: DateTime<Utc>, ttl: Duration) -> Result<Self> {
        if ttl <= Duration::zero() {
            return Err(Error::InvalidOperation(format!(
                "session lifetime must be positive, got {}s",
                ttl.num_seconds()
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            login_time,
            expires_at: login_time + ttl,
            is_active: true,
        })
    }

    /// Time left before expiry; zero or negative once expired
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_start_sets_expiry_after_login() {
        let login = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let session = Session::start(Uuid::new_v4(), login, Duration::minutes(5)).unwrap();

        assert!(session.expires_at > session.login_time);
        assert_eq!(session.expires_at, Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap());
        assert!(session.is_active);
    }

    #[test]
    fn test_start_rejects_non_positive_ttl() {
        let login = Utc::now();
        assert!(Session::start(Uuid::new_v4(), login, Duration::zero()).is_err());
        assert!(Session::start(Uuid::new_v4(), login, Duration::seconds(-1)).is_err());
    }

    #[test]
    fn test_remaining_time() {
        let login = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let session = Session::start(Uuid::new_v4(), login, Duration::minutes(5)).unwrap();

        assert_eq!(session.remaining_at(login + Duration::minutes(3)), Duration::minutes(2));
        assert_eq!(session.remaining_at(login + Duration::minutes(6)), Duration::minutes(-1));
    }
}
