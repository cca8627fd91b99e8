//! Page visit telemetry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One page visit; opened on mount, closed once on unmount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub user_id: Uuid,
    pub page_path: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
}

/// Columns identifying a single access-log row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessLogKey {
    pub user_id: Uuid,
    pub page_path: String,
    pub entry_time: DateTime<Utc>,
}

impl AccessLogEntry {
    pub fn open(user_id: Uuid, page_path: impl Into<String>, entry_time: DateTime<Utc>) -> Self {
        Self {
            user_id,
            page_path: page_path.into(),
            entry_time,
            exit_time: None,
            duration_seconds: None,
        }
    }

    pub fn key(&self) -> AccessLogKey {
        AccessLogKey {
            user_id: self.user_id,
            page_path: self.page_path.clone(),
            entry_time: self.entry_time,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.exit_time.is_some()
    }

    /// Record the exit and return the visit duration in seconds
    pub fn close(&mut self, exit_time: DateTime<Utc>) -> i64 {
        let duration = visit_duration_seconds(self.entry_time, exit_time);
        self.exit_time = Some(exit_time);
        self.duration_seconds = Some(duration);
        duration
    }
}

/// Whole seconds between entry and exit, floored and never negative
pub fn visit_duration_seconds(entry_time: DateTime<Utc>, exit_time: DateTime<Utc>) -> i64 {
    let millis = (exit_time - entry_time).num_milliseconds();
    (millis / 1000).max(0)
}
