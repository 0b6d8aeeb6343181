//! Request/response DTOs and their conversions into core types.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tasknest_core::domain::{TaskPriority, TaskStatus, User};
use tasknest_core::query::{
    Page, SortDirection, TaskFilter, TaskScope, TaskSort, TaskSortKey,
};
use tasknest_core::service::{
    CreateTaskInput, TaskDetails, UpdateTaskInput, UserUpsertInput,
};

use crate::errors::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreateRequest {
    pub full_name: String,
    pub email: String,
    pub telephone: String,
}

/// Embedded user reference on task payloads; upserted by email.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedUserRequest {
    pub full_name: String,
    pub email: String,
    pub telephone: String,
}

impl From<EmbeddedUserRequest> for UserUpsertInput {
    fn from(request: EmbeddedUserRequest) -> Self {
        Self {
            full_name: request.full_name,
            email: request.email,
            telephone: request.telephone,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub telephone: String,
    pub created_at_utc: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            telephone: user.telephone,
            created_at_utc: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateRequest {
    pub title: String,
    pub description: String,
    pub due_date_utc: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: Option<TaskStatus>,
    pub owner: EmbeddedUserRequest,
    pub assignee: Option<EmbeddedUserRequest>,
}

impl From<TaskCreateRequest> for CreateTaskInput {
    fn from(request: TaskCreateRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            due_date: request.due_date_utc,
            priority: request.priority,
            status: request.status,
            owner: request.owner.into(),
            assignee: request.assignee.map(Into::into),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateRequest {
    pub title: String,
    pub description: String,
    pub due_date_utc: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: Option<TaskStatus>,
    pub assigned_user_id: Option<Uuid>,
}

impl From<TaskUpdateRequest> for UpdateTaskInput {
    fn from(request: TaskUpdateRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            due_date: request.due_date_utc,
            priority: request.priority,
            status: request.status,
            assigned_user_id: request.assigned_user_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeUpdateRequest {
    pub assigned_user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub due_date_utc: DateTime<Utc>,
    pub priority: TaskPriority,
    /// Effective status: `Overdue` when the due date has drifted past
    /// without an update.
    pub status: TaskStatus,
    pub owner: UserResponse,
    pub assignee: Option<UserResponse>,
    pub reminder_sent: bool,
    pub due_notified_at_utc: Option<DateTime<Utc>>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
    /// Base64 of the stored version token; echo it back in `If-Match`.
    pub row_version: String,
}

impl From<TaskDetails> for TaskResponse {
    fn from(details: TaskDetails) -> Self {
        let task = details.task;
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            due_date_utc: task.due_date,
            priority: task.priority,
            status: task.effective_status(Utc::now()),
            owner: details.owner.into(),
            assignee: details.assignee.map(Into::into),
            reminder_sent: task.reminder_sent,
            due_notified_at_utc: task.due_notified_at,
            created_at_utc: task.created_at,
            updated_at_utc: task.updated_at,
            row_version: BASE64.encode(&task.version),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub scope: Option<String>,
    pub owner_user_id: Option<Uuid>,
    pub assigned_user_id: Option<Uuid>,
    /// Comma-separated status names.
    pub status: Option<String>,
    /// Comma-separated priority names.
    pub priority: Option<String>,
    pub overdue_only: Option<bool>,
    pub reminder_sent: Option<bool>,
    pub search: Option<String>,
    pub sort_by: Option<TaskSortKey>,
    pub sort_dir: Option<SortDirection>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl TaskListQuery {
    pub fn into_parts(self) -> Result<(TaskFilter, TaskSort, Page), ApiError> {
        let scope = match self.scope.as_deref() {
            None | Some("any") | Some("all") => TaskScope::All,
            Some("owner") => TaskScope::OwnedBy(self.owner_user_id.ok_or_else(|| {
                ApiError::validation("scope=owner requires ownerUserId")
            })?),
            Some("assignee") => TaskScope::AssignedTo(self.assigned_user_id.ok_or_else(
                || ApiError::validation("scope=assignee requires assignedUserId"),
            )?),
            Some(other) => {
                return Err(ApiError::validation(format!("unknown scope '{other}'")));
            }
        };

        let filter = TaskFilter {
            scope,
            statuses: parse_csv::<TaskStatus>(self.status.as_deref(), "status")?,
            priorities: parse_csv::<TaskPriority>(self.priority.as_deref(), "priority")?,
            overdue_only: self.overdue_only.unwrap_or(false),
            reminder_sent: self.reminder_sent,
            search: self.search.filter(|s| !s.trim().is_empty()),
        };
        let sort = TaskSort {
            key: self.sort_by.unwrap_or_default(),
            direction: self.sort_dir.unwrap_or_default(),
        };
        let page = Page::clamped(self.page, self.page_size);
        Ok((filter, sort, page))
    }
}

fn parse_csv<T>(raw: Option<&str>, field: &str) -> Result<Vec<T>, ApiError>
where
    T: for<'a> TryFrom<&'a str>,
{
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            T::try_from(token)
                .map_err(|_| ApiError::validation(format!("unknown {field} '{token}'")))
        })
        .collect()
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}
