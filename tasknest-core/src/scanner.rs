//! Periodic due-scan worker: claim a batch of overdue tasks atomically, then
//! publish one notification per claimed row.
//!
//! Correctness does not depend on there being a single instance. The claim is
//! one conditional statement, so across any number of concurrent scanners a
//! given row's `due_notified_at` transitions from absent to set at most once;
//! later ticks never reclaim it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::broker::DuePublisher;
use crate::config::DueScanConfig;
use crate::database::ports::TaskRepository;
use crate::error::{CoreError, Result};
use crate::events::TaskDueV1;

pub struct DueScanWorker {
    repository: Arc<dyn TaskRepository>,
    publisher: Arc<dyn DuePublisher>,
    config: DueScanConfig,
}

impl DueScanWorker {
    pub fn new(
        repository: Arc<dyn TaskRepository>,
        publisher: Arc<dyn DuePublisher>,
        config: DueScanConfig,
    ) -> Self {
        Self {
            repository,
            publisher,
            config,
        }
    }

    /// Runs the scan loop until the token is cancelled. Exits within one
    /// interval of cancellation; per-tick failures are logged and the loop
    /// carries on at the next tick.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            batch_size = self.config.batch_size,
            "due scan worker started"
        );

        loop {
            match self.scan_once(Utc::now()).await {
                Ok(0) => {}
                Ok(published) => info!(published, "due notifications published"),
                Err(CoreError::StoreNotReady(detail)) => {
                    // Cold-start race with schema creation; the table will
                    // appear on a later tick.
                    debug!(detail = %detail, "task table not ready, skipping scan");
                }
                Err(e) => error!(error = %e, "due scan tick failed"),
            }

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("due scan worker stopping");
                    return;
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    /// One scan tick: claim up to `batch_size` due rows at `now`, then emit
    /// one event per claimed row. Returns how many notifications were
    /// published; publish failures are logged, counted out, and never abort
    /// the tick (the row stays marked notified — see DESIGN notes on the
    /// outbox trade-off).
    pub async fn scan_once(&self, now: DateTime<Utc>) -> Result<usize> {
        let claimed = self
            .repository
            .claim_due(now, self.config.batch_size)
            .await?;
        if claimed == 0 {
            return Ok(0);
        }
        debug!(claimed, "claimed due tasks");

        let rows = self.repository.select_claimed_at(now).await?;
        let mut published = 0;
        for row in rows {
            let event = TaskDueV1 {
                task_id: row.id,
                title: row.title,
                due_date_utc: row.due_date,
                timestamp_utc: now,
            };
            match self.publisher.publish_due(&event).await {
                Ok(()) => published += 1,
                Err(e) => {
                    warn!(task_id = %event.task_id, error = %e, "failed to publish due notification");
                }
            }
        }
        Ok(published)
    }
}
