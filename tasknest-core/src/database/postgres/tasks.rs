use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::ports::{ClaimedTask, TaskRepository};
use crate::database::store_error;
use crate::domain::{fresh_version, Task, TaskPriority, TaskStatus};
use crate::error::{CoreError, Result};
use crate::query::{Page, SortDirection, TaskFilter, TaskScope, TaskSort, TaskSortKey};

const TASK_COLUMNS: &str = r#"
    id, title, description, due_date, priority, status,
    owner_id, assignee_id, reminder_sent, due_notified_at,
    created_at, updated_at, version
"#;

#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| store_error("Failed to load task", e))?;

        row.map(row_to_task).transpose()
    }

    async fn list(
        &self,
        filter: &TaskFilter,
        sort: &TaskSort,
        page: &Page,
    ) -> Result<(Vec<Task>, i64)> {
        let now = Utc::now();

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks WHERE 1=1");
        push_filters(&mut count, filter, now);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(|e| store_error("Failed to count tasks", e))?;

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE 1=1"
        ));
        push_filters(&mut builder, filter, now);
        push_order(&mut builder, sort);
        builder.push(" LIMIT ");
        builder.push_bind(page.size);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset());

        let rows = builder
            .build_query_as::<TaskRow>()
            .fetch_all(self.pool())
            .await
            .map_err(|e| store_error("Failed to list tasks", e))?;

        let tasks = rows.into_iter().map(row_to_task).collect::<Result<_>>()?;
        Ok((tasks, total))
    }

    async fn create(&self, task: &Task) -> Result<Task> {
        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, title, description, due_date, priority, status,
                owner_id, assignee_id, reminder_sent, due_notified_at,
                created_at, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.due_date)
        .bind(task.priority.as_str())
        .bind(task.status.as_str())
        .bind(task.owner_id)
        .bind(task.assignee_id)
        .bind(task.reminder_sent)
        .bind(task.due_notified_at)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(&task.version)
        .execute(self.pool())
        .await
        .map_err(|e| store_error("Failed to insert task", e))?;

        Ok(task.clone())
    }

    async fn update_if_version(&self, task: &Task, expected_version: &[u8]) -> Result<Task> {
        let mut updated = task.clone();
        updated.updated_at = Utc::now();
        updated.version = fresh_version();

        // One conditional statement; the version predicate closes the
        // read-then-write race window entirely.
        let result = sqlx::query(
            r#"
            UPDATE tasks SET
                title = $1, description = $2, due_date = $3, priority = $4,
                status = $5, owner_id = $6, assignee_id = $7,
                reminder_sent = $8, due_notified_at = $9,
                updated_at = $10, version = $11
            WHERE id = $12 AND version = $13
            "#,
        )
        .bind(&updated.title)
        .bind(&updated.description)
        .bind(updated.due_date)
        .bind(updated.priority.as_str())
        .bind(updated.status.as_str())
        .bind(updated.owner_id)
        .bind(updated.assignee_id)
        .bind(updated.reminder_sent)
        .bind(updated.due_notified_at)
        .bind(updated.updated_at)
        .bind(&updated.version)
        .bind(updated.id)
        .bind(expected_version.to_vec())
        .execute(self.pool())
        .await
        .map_err(|e| store_error("Failed to update task", e))?;

        if result.rows_affected() == 1 {
            return Ok(updated);
        }

        // Zero rows: distinguish a vanished row from a stale token.
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tasks WHERE id = $1)")
                .bind(task.id)
                .fetch_one(self.pool())
                .await
                .map_err(|e| store_error("Failed to probe task existence", e))?;

        if exists {
            Err(CoreError::ConcurrencyConflict(format!(
                "task {} was modified concurrently",
                task.id
            )))
        } else {
            Err(CoreError::NotFound(format!("task {}", task.id)))
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(|e| store_error("Failed to delete task", e))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("task {id}")));
        }
        Ok(())
    }

    async fn claim_due(&self, now: DateTime<Utc>, batch_size: i64) -> Result<u64> {
        // The NULL predicate is evaluated inside the same statement as the
        // UPDATE, and SKIP LOCKED keeps parallel scanners from queueing on
        // each other's candidate rows: a given row is claimed at most once.
        let result = sqlx::query(
            r#"
            UPDATE tasks SET due_notified_at = $1
            WHERE due_notified_at IS NULL AND id IN (
                SELECT id FROM tasks
                WHERE due_date < $1
                  AND due_notified_at IS NULL
                  AND status NOT IN ('completed', 'cancelled')
                ORDER BY due_date ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            "#,
        )
        .bind(now)
        .bind(batch_size)
        .execute(self.pool())
        .await
        .map_err(|e| store_error("Failed to claim due tasks", e))?;

        Ok(result.rows_affected())
    }

    async fn select_claimed_at(&self, now: DateTime<Utc>) -> Result<Vec<ClaimedTask>> {
        let rows = sqlx::query_as::<_, ClaimedRow>(
            r#"
            SELECT id, title, due_date FROM tasks
            WHERE due_notified_at = $1
            ORDER BY due_date ASC
            "#,
        )
        .bind(now)
        .fetch_all(self.pool())
        .await
        .map_err(|e| store_error("Failed to select claimed tasks", e))?;

        Ok(rows
            .into_iter()
            .map(|row| ClaimedTask {
                id: row.id,
                title: row.title,
                due_date: row.due_date,
            })
            .collect())
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TaskFilter, now: DateTime<Utc>) {
    match filter.scope {
        TaskScope::All => {}
        TaskScope::OwnedBy(owner) => {
            builder.push(" AND owner_id = ");
            builder.push_bind(owner);
        }
        TaskScope::AssignedTo(assignee) => {
            builder.push(" AND assignee_id = ");
            builder.push_bind(assignee);
        }
    }

    if !filter.statuses.is_empty() {
        builder.push(" AND status IN (");
        let mut separated = builder.separated(", ");
        for status in &filter.statuses {
            separated.push_bind(status.as_str());
        }
        builder.push(")");
    }

    if !filter.priorities.is_empty() {
        builder.push(" AND priority IN (");
        let mut separated = builder.separated(", ");
        for priority in &filter.priorities {
            separated.push_bind(priority.as_str());
        }
        builder.push(")");
    }

    if filter.overdue_only {
        builder.push(" AND due_date < ");
        builder.push_bind(now);
        builder.push(" AND status NOT IN ('completed', 'cancelled')");
    }

    if let Some(flag) = filter.reminder_sent {
        builder.push(" AND reminder_sent = ");
        builder.push_bind(flag);
    }

    if let Some(needle) = &filter.search {
        let pattern = format!("%{needle}%");
        builder.push(" AND (title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR description ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

fn push_order(builder: &mut QueryBuilder<'_, Postgres>, sort: &TaskSort) {
    let key = match sort.key {
        TaskSortKey::DueDate => "due_date",
        TaskSortKey::CreatedAt => "created_at",
        TaskSortKey::Title => "title",
        TaskSortKey::Status => "status",
        TaskSortKey::Priority => {
            "CASE priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 WHEN 'high' THEN 2 ELSE 3 END"
        }
    };
    let direction = match sort.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    // Ties broken by id so fixed filters paginate deterministically.
    builder.push(format!(" ORDER BY {key} {direction}, id ASC"));
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: String,
    due_date: DateTime<Utc>,
    priority: String,
    status: String,
    owner_id: Uuid,
    assignee_id: Option<Uuid>,
    reminder_sent: bool,
    due_notified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: Vec<u8>,
}

#[derive(sqlx::FromRow)]
struct ClaimedRow {
    id: Uuid,
    title: String,
    due_date: DateTime<Utc>,
}

fn row_to_task(row: TaskRow) -> Result<Task> {
    let status = TaskStatus::try_from(row.status.as_str())
        .map_err(|e| CoreError::Internal(format!("Corrupt task status: {e}")))?;
    let priority = TaskPriority::try_from(row.priority.as_str())
        .map_err(|e| CoreError::Internal(format!("Corrupt task priority: {e}")))?;

    Ok(Task {
        id: row.id,
        title: row.title,
        description: row.description,
        due_date: row.due_date,
        priority,
        status,
        owner_id: row.owner_id,
        assignee_id: row.assignee_id,
        reminder_sent: row.reminder_sent,
        due_notified_at: row.due_notified_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
        version: row.version,
    })
}
