use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::User;
use crate::error::Result;
use crate::query::Page;

/// User store. Users are created explicitly or upserted by email during task
/// writes; the core never deletes them.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<User>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Lookup by normalized (lower-cased, trimmed) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Batch lookup used to populate owner/assignee on task listings.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>>;

    /// Single conditional insert-or-update keyed by normalized email; not a
    /// read-then-write. An existing row keeps its id and `created_at` but
    /// takes the new name and telephone.
    async fn upsert_by_email(&self, full_name: &str, email: &str, telephone: &str)
        -> Result<User>;

    /// Paged listing with optional substring search over name and email.
    async fn search(&self, query: Option<&str>, page: &Page) -> Result<(Vec<User>, i64)>;
}
