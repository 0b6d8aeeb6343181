//! In-memory repositories behind the same ports as Postgres.
//!
//! Used by tests and infrastructure-free development. The adapter honors the
//! same version-token and claim semantics as the SQL statements, including
//! at-most-once claiming under concurrent callers (the write lock serializes
//! the claim the way the single UPDATE statement does).

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::ports::{ClaimedTask, TaskRepository, UserRepository};
use crate::domain::{fresh_version, normalize_email, Task, User};
use crate::error::{CoreError, Result};
use crate::query::{Page, SortDirection, TaskFilter, TaskSort, TaskSortKey};

#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test seam: stores a task verbatim, bypassing service rules.
    pub fn seed(&self, task: Task) {
        self.state
            .write()
            .expect("task store lock poisoned")
            .insert(task.id, task);
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<Uuid, Task>>> {
        self.state
            .read()
            .map_err(|e| CoreError::Internal(format!("task store lock poisoned: {e}")))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Task>>> {
        self.state
            .write()
            .map_err(|e| CoreError::Internal(format!("task store lock poisoned: {e}")))
    }
}

fn compare_tasks(a: &Task, b: &Task, sort: &TaskSort) -> Ordering {
    let ordering = match sort.key {
        TaskSortKey::DueDate => a.due_date.cmp(&b.due_date),
        TaskSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
        TaskSortKey::Priority => a.priority.rank().cmp(&b.priority.rank()),
        TaskSortKey::Status => a.status.as_str().cmp(b.status.as_str()),
        TaskSortKey::Title => a.title.cmp(&b.title),
    };
    let ordering = match sort.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    };
    // Same tie-break as the SQL adapter.
    ordering.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.read()?.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &TaskFilter,
        sort: &TaskSort,
        page: &Page,
    ) -> Result<(Vec<Task>, i64)> {
        let now = Utc::now();
        let mut matched: Vec<Task> = self
            .read()?
            .values()
            .filter(|task| filter.matches(task, now))
            .cloned()
            .collect();
        matched.sort_by(|a, b| compare_tasks(a, b, sort));

        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok((items, total))
    }

    async fn create(&self, task: &Task) -> Result<Task> {
        let mut state = self.write()?;
        if state.contains_key(&task.id) {
            return Err(CoreError::Internal(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        state.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn update_if_version(&self, task: &Task, expected_version: &[u8]) -> Result<Task> {
        let mut state = self.write()?;
        let stored = state
            .get_mut(&task.id)
            .ok_or_else(|| CoreError::NotFound(format!("task {}", task.id)))?;

        if stored.version != expected_version {
            return Err(CoreError::ConcurrencyConflict(format!(
                "task {} was modified concurrently",
                task.id
            )));
        }

        let mut updated = task.clone();
        updated.updated_at = Utc::now();
        updated.version = fresh_version();
        *stored = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.write()?;
        state
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CoreError::NotFound(format!("task {id}")))
    }

    async fn claim_due(&self, now: DateTime<Utc>, batch_size: i64) -> Result<u64> {
        let mut state = self.write()?;
        let mut eligible: Vec<Uuid> = state
            .values()
            .filter(|task| {
                task.due_date < now && task.due_notified_at.is_none() && !task.status.is_terminal()
            })
            .map(|task| task.id)
            .collect();
        eligible.sort_by_key(|id| state[id].due_date);
        eligible.truncate(batch_size.max(0) as usize);

        for id in &eligible {
            if let Some(task) = state.get_mut(id) {
                task.due_notified_at = Some(now);
            }
        }
        Ok(eligible.len() as u64)
    }

    async fn select_claimed_at(&self, now: DateTime<Utc>) -> Result<Vec<ClaimedTask>> {
        let state = self.read()?;
        let mut claimed: Vec<ClaimedTask> = state
            .values()
            .filter(|task| task.due_notified_at == Some(now))
            .map(|task| ClaimedTask {
                id: task.id,
                title: task.title.clone(),
                due_date: task.due_date,
            })
            .collect();
        claimed.sort_by_key(|task| task.due_date);
        Ok(claimed)
    }
}

#[derive(Debug, Default)]
struct UserState {
    users: HashMap<Uuid, User>,
    email_index: HashMap<String, Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    state: Arc<RwLock<UserState>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, UserState>> {
        self.state
            .read()
            .map_err(|e| CoreError::Internal(format!("user store lock poisoned: {e}")))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, UserState>> {
        self.state
            .write()
            .map_err(|e| CoreError::Internal(format!("user store lock poisoned: {e}")))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        let mut state = self.write()?;
        if state.email_index.contains_key(&user.email) {
            return Err(CoreError::Validation(format!(
                "email {} is already registered",
                user.email
            )));
        }
        state.email_index.insert(user.email.clone(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.read()?;
        Ok(state
            .email_index
            .get(&normalize_email(email))
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.users.get(id))
            .cloned()
            .collect())
    }

    async fn upsert_by_email(
        &self,
        full_name: &str,
        email: &str,
        telephone: &str,
    ) -> Result<User> {
        let normalized = normalize_email(email);
        let mut state = self.write()?;

        if let Some(id) = state.email_index.get(&normalized).copied() {
            let user = state
                .users
                .get_mut(&id)
                .ok_or_else(|| CoreError::Internal("email index out of sync".into()))?;
            user.full_name = full_name.to_owned();
            user.telephone = telephone.to_owned();
            return Ok(user.clone());
        }

        let user = User::new(full_name, &normalized, telephone);
        state.email_index.insert(normalized, user.id);
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn search(&self, query: Option<&str>, page: &Page) -> Result<(Vec<User>, i64)> {
        let state = self.read()?;
        let needle = query.map(str::to_lowercase);
        let mut matched: Vec<User> = state
            .users
            .values()
            .filter(|user| match &needle {
                Some(n) => {
                    user.full_name.to_lowercase().contains(n) || user.email.contains(n)
                }
                None => true,
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let total = matched.len() as i64;
        let items = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok((items, total))
    }
}
