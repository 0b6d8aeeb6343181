use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::Task;
use crate::error::Result;
use crate::query::{Page, TaskFilter, TaskSort};

/// Projection of a freshly claimed row, enough to build the due event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedTask {
    pub id: Uuid,
    pub title: String,
    pub due_date: DateTime<Utc>,
}

/// Sole writer to the task table. Enforces version-token concurrency on
/// updates and owns the atomic claim used by the due scanner.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>>;

    /// Filtered, sorted, paginated listing plus the unpaged total count.
    async fn list(
        &self,
        filter: &TaskFilter,
        sort: &TaskSort,
        page: &Page,
    ) -> Result<(Vec<Task>, i64)>;

    async fn create(&self, task: &Task) -> Result<Task>;

    /// Updates all mutable fields, refreshing `updated_at` and the version
    /// token, if and only if the stored version equals `expected_version`.
    ///
    /// Single atomic conditional write; a mismatch surfaces as
    /// `ConcurrencyConflict` with no retry.
    async fn update_if_version(&self, task: &Task, expected_version: &[u8]) -> Result<Task>;

    /// Deletes without a version check; deletion is absolute.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Atomically stamps `due_notified_at = now` on up to `batch_size` rows
    /// that are due, unclaimed, and non-terminal, oldest due date first.
    /// Returns the number of rows claimed. Race-free against concurrent
    /// scanner instances: a row transitions from unclaimed to claimed at
    /// most once.
    async fn claim_due(&self, now: DateTime<Utc>, batch_size: i64) -> Result<u64>;

    /// Rows whose claim marker equals exactly the instant just used by
    /// `claim_due`, so the scanner can emit one message per newly claimed
    /// row without holding a cursor across the claim.
    async fn select_claimed_at(&self, now: DateTime<Utc>) -> Result<Vec<ClaimedTask>>;
}
