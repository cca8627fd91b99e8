//! Page visit telemetry
//!
//! A visit writes an open access-log row when a view activates and closes it
//! with the visit duration when the view goes away. Store failures are logged
//! and dropped; telemetry never reaches the user.

use std::sync::Arc;

use gestor_core::invariants::assert_access_log_invariants;
use gestor_core::{AccessLogEntry, Backend, Clock, DataStore};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AccessLogger {
    backend: Arc<dyn Backend>,
    clock: Arc<dyn Clock>,
}

impl AccessLogger {
    pub fn new(backend: Arc<dyn Backend>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Record the entry of `user_id` into `page_path`
    pub async fn enter(&self, user_id: Uuid, page_path: &str) -> PageVisit {
        let entry = AccessLogEntry::open(user_id, page_path, self.clock.now());

        if let Err(e) = self.backend.insert_access_log(&entry).await {
            warn!(%user_id, page_path, error = %e, "Failed to record page entry");
        } else {
            debug!(%user_id, page_path, "Page entry recorded");
        }

        PageVisit {
            logger: self.clone(),
            entry,
            closed: false,
        }
    }
}

/// An open visit; call [`PageVisit::leave`] on deactivation
pub struct PageVisit {
    logger: AccessLogger,
    entry: AccessLogEntry,
    closed: bool,
}

impl PageVisit {
    pub fn entry(&self) -> &AccessLogEntry {
        &self.entry
    }

    /// Close the row with the exit time; returns the duration in seconds
    pub async fn leave(mut self) -> i64 {
        let exit_time = self.logger.clock.now();
        let duration = self.entry.close(exit_time);
        self.closed = true;
        assert_access_log_invariants(&self.entry);

        let key = self.entry.key();
        if let Err(e) = self
            .logger
            .backend
            .close_access_log(&key, exit_time, duration)
            .await
        {
            warn!(
                user_id = %key.user_id,
                page_path = %key.page_path,
                error = %e,
                "Failed to record page exit"
            );
        } else {
            debug!(page_path = %key.page_path, duration, "Page exit recorded");
        }

        duration
    }
}

impl Drop for PageVisit {
    fn drop(&mut self) {
        if !self.closed {
            debug!(page_path = %self.entry.page_path, "Visit dropped without exit, row stays open");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, fixture};
    use chrono::Duration;
    use gestor_core::testing::Call;

    #[tokio::test]
    async fn test_visit_writes_entry_then_exit() {
        let fx = fixture(Duration::hours(1)).await;
        let logger = AccessLogger::new(fx.recording.clone(), Arc::new(fx.clock.clone()));

        let visit = logger.enter(fx.analyst_id, "/dashboard").await;
        let key = visit.entry().key();
        assert_eq!(key.entry_time, at(9, 0));

        fx.clock.advance(Duration::milliseconds(95_700));
        let duration = visit.leave().await;
        assert_eq!(duration, 95);

        assert_eq!(
            fx.recording.calls(),
            vec![Call::InsertAccessLog, Call::CloseAccessLog]
        );
        let row = fx
            .recording
            .inner()
            .with_db(|db| db.access_logs().find(&key))
            .unwrap()
            .unwrap();
        assert_eq!(row.exit_time, Some(at(9, 0) + Duration::milliseconds(95_700)));
        assert_eq!(row.duration_seconds, Some(95));
    }

    #[tokio::test]
    async fn test_clock_going_back_clamps_to_zero() {
        let fx = fixture(Duration::hours(1)).await;
        let logger = AccessLogger::new(fx.recording.clone(), Arc::new(fx.clock.clone()));

        let visit = logger.enter(fx.analyst_id, "/dashboard").await;
        fx.clock.set(at(8, 59));
        assert_eq!(visit.leave().await, 0);
    }

    #[tokio::test]
    async fn test_insert_failure_is_swallowed() {
        let fx = fixture(Duration::hours(1)).await;
        fx.recording.fail_on(Call::InsertAccessLog);
        let logger = AccessLogger::new(fx.recording.clone(), Arc::new(fx.clock.clone()));

        let visit = logger.enter(fx.analyst_id, "/dashboard").await;
        fx.clock.advance(Duration::seconds(10));

        // The exit update is still attempted and finds no row
        assert_eq!(visit.leave().await, 10);
        assert_eq!(
            fx.recording.calls(),
            vec![Call::InsertAccessLog, Call::CloseAccessLog]
        );
    }

    #[tokio::test]
    async fn test_unclosed_visit_leaves_open_row() {
        let fx = fixture(Duration::hours(1)).await;
        let logger = AccessLogger::new(fx.recording.clone(), Arc::new(fx.clock.clone()));

        drop(logger.enter(fx.analyst_id, "/dashboard").await);

        let open = fx
            .recording
            .inner()
            .with_db(|db| db.access_logs().count_open(fx.analyst_id))
            .unwrap();
        assert_eq!(open, 1);
    }
}
