//! Task domain rules: create/update validation, upsert-by-email for embedded
//! user references, the overdue gate, and computed `Overdue` status.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::database::ports::{TaskRepository, UserRepository};
use crate::domain::{fresh_version, Task, TaskPriority, TaskStatus, User};
use crate::error::{CoreError, Result};
use crate::query::{Page, Paged, TaskFilter, TaskSort};

/// Embedded user reference carried by task create/update payloads; matched
/// to an existing user by normalized email, created otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpsertInput {
    pub full_name: String,
    pub email: String,
    pub telephone: String,
}

#[derive(Debug, Clone)]
pub struct CreateTaskInput {
    pub title: String,
    pub description: String,
    pub due_date: chrono::DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: Option<TaskStatus>,
    pub owner: UserUpsertInput,
    pub assignee: Option<UserUpsertInput>,
}

#[derive(Debug, Clone)]
pub struct UpdateTaskInput {
    pub title: String,
    pub description: String,
    pub due_date: chrono::DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: Option<TaskStatus>,
    pub assigned_user_id: Option<Uuid>,
}

/// Task joined with its owner and assignee rows.
#[derive(Debug, Clone)]
pub struct TaskDetails {
    pub task: Task,
    pub owner: User,
    pub assignee: Option<User>,
}

#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    users: Arc<dyn UserRepository>,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { tasks, users }
    }

    pub async fn create_task(&self, input: CreateTaskInput) -> Result<TaskDetails> {
        let now = Utc::now();
        if input.due_date <= now {
            return Err(CoreError::InvalidOperation(
                "due date must be in the future".into(),
            ));
        }
        if input.status == Some(TaskStatus::Overdue) {
            return Err(CoreError::InvalidOperation(
                "overdue is a computed status and cannot be set by clients".into(),
            ));
        }

        let owner = self
            .users
            .upsert_by_email(&input.owner.full_name, &input.owner.email, &input.owner.telephone)
            .await?;

        // Absent assignee defaults to the owner.
        let assignee = match &input.assignee {
            Some(reference) => {
                self.users
                    .upsert_by_email(&reference.full_name, &reference.email, &reference.telephone)
                    .await?
            }
            None => owner.clone(),
        };

        let task = Task {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            due_date: input.due_date,
            priority: input.priority,
            status: input.status.unwrap_or(TaskStatus::Open),
            owner_id: owner.id,
            assignee_id: Some(assignee.id),
            reminder_sent: false,
            due_notified_at: None,
            created_at: now,
            updated_at: now,
            version: fresh_version(),
        };

        let task = self.tasks.create(&task).await?;
        debug!(task_id = %task.id, "task created");
        Ok(TaskDetails {
            task,
            owner,
            assignee: Some(assignee),
        })
    }

    pub async fn get_task(&self, id: Uuid) -> Result<TaskDetails> {
        let task = self
            .tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("task {id}")))?;
        self.attach_users(task).await
    }

    pub async fn list_tasks(
        &self,
        filter: &TaskFilter,
        sort: &TaskSort,
        page: &Page,
    ) -> Result<Paged<TaskDetails>> {
        let (tasks, total) = self.tasks.list(filter, sort, page).await?;

        let mut ids: Vec<Uuid> = tasks
            .iter()
            .flat_map(|task| [Some(task.owner_id), task.assignee_id])
            .flatten()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        let users: HashMap<Uuid, User> = self
            .users
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        let items = tasks
            .into_iter()
            .map(|task| {
                let owner = users
                    .get(&task.owner_id)
                    .cloned()
                    .ok_or_else(|| CoreError::Internal(format!("owner row missing for task {}", task.id)))?;
                let assignee = task.assignee_id.and_then(|id| users.get(&id).cloned());
                Ok(TaskDetails {
                    task,
                    owner,
                    assignee,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Paged::new(items, page, total))
    }

    pub async fn update_task(
        &self,
        id: Uuid,
        input: UpdateTaskInput,
        expected_version: &[u8],
    ) -> Result<TaskDetails> {
        let stored = self
            .tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("task {id}")))?;

        if input.status == Some(TaskStatus::Overdue) {
            return Err(CoreError::InvalidOperation(
                "overdue is a computed status and cannot be set by clients".into(),
            ));
        }

        let now = Utc::now();
        if input.due_date < now {
            return Err(CoreError::InvalidOperation(
                "due date must not be in the past".into(),
            ));
        }
        if stored.is_overdue(now) && input.due_date <= now {
            return Err(CoreError::InvalidOperation(
                "cannot update overdue task unless due date moves to future".into(),
            ));
        }

        if let Some(assignee_id) = input.assigned_user_id {
            if stored.assignee_id != Some(assignee_id) {
                self.users
                    .find_by_id(assignee_id)
                    .await?
                    .ok_or_else(|| CoreError::NotFound(format!("user {assignee_id}")))?;
            }
        }

        let mut updated = stored.clone();
        updated.title = input.title;
        updated.description = input.description;
        updated.due_date = input.due_date;
        updated.priority = input.priority;
        updated.status = input.status.unwrap_or(stored.status);
        updated.assignee_id = input.assigned_user_id;
        recompute_status(&mut updated, now);

        let task = self.tasks.update_if_version(&updated, expected_version).await?;
        self.attach_users(task).await
    }

    pub async fn update_task_status(
        &self,
        id: Uuid,
        status: TaskStatus,
        expected_version: &[u8],
    ) -> Result<TaskDetails> {
        if status == TaskStatus::Overdue {
            return Err(CoreError::InvalidOperation(
                "overdue is a computed status and cannot be set by clients".into(),
            ));
        }

        let stored = self
            .tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("task {id}")))?;

        let now = Utc::now();
        if stored.is_overdue(now) {
            return Err(CoreError::InvalidOperation(
                "cannot update overdue task unless due date moves to future".into(),
            ));
        }

        let mut updated = stored;
        updated.status = status;
        recompute_status(&mut updated, now);

        let task = self.tasks.update_if_version(&updated, expected_version).await?;
        self.attach_users(task).await
    }

    pub async fn update_task_assignee(
        &self,
        id: Uuid,
        assignee_id: Option<Uuid>,
        expected_version: &[u8],
    ) -> Result<TaskDetails> {
        let stored = self
            .tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("task {id}")))?;

        if let Some(user_id) = assignee_id {
            self.users
                .find_by_id(user_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("user {user_id}")))?;
        }

        let mut updated = stored;
        updated.assignee_id = assignee_id;

        let task = self.tasks.update_if_version(&updated, expected_version).await?;
        self.attach_users(task).await
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<()> {
        self.tasks.delete(id).await
    }

    async fn attach_users(&self, task: Task) -> Result<TaskDetails> {
        let owner = self
            .users
            .find_by_id(task.owner_id)
            .await?
            .ok_or_else(|| CoreError::Internal(format!("owner row missing for task {}", task.id)))?;
        let assignee = match task.assignee_id {
            Some(id) => self.users.find_by_id(id).await?,
            None => None,
        };
        Ok(TaskDetails {
            task,
            owner,
            assignee,
        })
    }
}

/// `Overdue` is derived: a write that leaves the task past due lands in
/// `Overdue`; a stale stored `Overdue` whose due date moved to the future
/// falls back to `Open`.
fn recompute_status(task: &mut Task, now: chrono::DateTime<Utc>) {
    if task.is_overdue(now) {
        task.status = TaskStatus::Overdue;
    } else if task.status == TaskStatus::Overdue {
        task.status = TaskStatus::Open;
    }
}
