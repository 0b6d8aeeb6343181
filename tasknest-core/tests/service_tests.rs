//! Domain-rule tests for the task and user services over the in-memory
//! repositories.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use tasknest_core::database::memory::{InMemoryTaskRepository, InMemoryUserRepository};
use tasknest_core::database::ports::UserRepository;
use tasknest_core::domain::{fresh_version, Task, TaskPriority, TaskStatus, User};
use tasknest_core::error::CoreError;
use tasknest_core::query::{Page, TaskFilter, TaskSort};
use tasknest_core::service::{
    CreateTaskInput, TaskService, UpdateTaskInput, UserUpsertInput,
};

struct Fixture {
    service: TaskService,
    tasks: InMemoryTaskRepository,
    users: InMemoryUserRepository,
}

fn fixture() -> Fixture {
    let tasks = InMemoryTaskRepository::new();
    let users = InMemoryUserRepository::new();
    let service = TaskService::new(Arc::new(tasks.clone()), Arc::new(users.clone()));
    Fixture {
        service,
        tasks,
        users,
    }
}

fn owner_input() -> UserUpsertInput {
    UserUpsertInput {
        full_name: "Ada Lovelace".into(),
        email: "ada@example.io".into(),
        telephone: "+972501234567".into(),
    }
}

fn create_input(due_minutes: i64) -> CreateTaskInput {
    CreateTaskInput {
        title: "T1".into(),
        description: "write the report".into(),
        due_date: Utc::now() + Duration::minutes(due_minutes),
        priority: TaskPriority::Medium,
        status: None,
        owner: owner_input(),
        assignee: None,
    }
}

fn update_input(task: &Task, due_minutes: i64) -> UpdateTaskInput {
    UpdateTaskInput {
        title: task.title.clone(),
        description: task.description.clone(),
        due_date: Utc::now() + Duration::minutes(due_minutes),
        priority: task.priority,
        status: None,
        assigned_user_id: task.assignee_id,
    }
}

/// Seeds an overdue task directly, bypassing the create-time validation the
/// service would apply.
async fn seed_overdue(fx: &Fixture, minutes_past: i64, status: TaskStatus) -> Task {
    let owner = fx
        .users
        .create(&User::new("Grace Hopper", "grace@example.io", "+15550100"))
        .await
        .unwrap();
    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4(),
        title: "late".into(),
        description: String::new(),
        due_date: now - Duration::minutes(minutes_past),
        priority: TaskPriority::High,
        status,
        owner_id: owner.id,
        assignee_id: Some(owner.id),
        reminder_sent: false,
        due_notified_at: None,
        created_at: now - Duration::hours(2),
        updated_at: now - Duration::hours(2),
        version: fresh_version(),
    };
    fx.tasks.seed(task.clone());
    task
}

#[tokio::test]
async fn create_defaults_to_open_with_owner_as_assignee() {
    let fx = fixture();
    let details = fx.service.create_task(create_input(60)).await.unwrap();

    assert_eq!(details.task.status, TaskStatus::Open);
    assert_eq!(details.owner.email, "ada@example.io");
    assert_eq!(details.assignee.as_ref().unwrap().id, details.owner.id);
    assert!(!details.task.version.is_empty());
    assert!(details.task.due_notified_at.is_none());
}

#[tokio::test]
async fn create_rejects_past_due_date() {
    let fx = fixture();
    let err = fx.service.create_task(create_input(-60)).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidOperation(_)));
}

#[tokio::test]
async fn create_rejects_explicit_overdue_status() {
    let fx = fixture();
    let mut input = create_input(60);
    input.status = Some(TaskStatus::Overdue);
    let err = fx.service.create_task(input).await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidOperation(_)));
}

#[tokio::test]
async fn create_upserts_distinct_assignee() {
    let fx = fixture();
    let mut input = create_input(60);
    input.assignee = Some(UserUpsertInput {
        full_name: "Barbara Liskov".into(),
        email: "barbara@example.io".into(),
        telephone: "+15550101".into(),
    });
    let details = fx.service.create_task(input).await.unwrap();
    assert_ne!(details.assignee.as_ref().unwrap().id, details.owner.id);
}

#[tokio::test]
async fn upsert_by_email_is_idempotent_and_updates_profile() {
    let fx = fixture();
    let first = fx.service.create_task(create_input(60)).await.unwrap();

    // Same email, different case and profile fields: same user row.
    let mut input = create_input(90);
    input.owner.email = "  ADA@Example.io ".into();
    input.owner.full_name = "Ada King".into();
    let second = fx.service.create_task(input).await.unwrap();

    assert_eq!(first.owner.id, second.owner.id);
    assert_eq!(second.owner.full_name, "Ada King");
    assert_eq!(second.owner.email, "ada@example.io");
}

#[tokio::test]
async fn stale_version_update_conflicts_and_winner_gets_new_version() {
    let fx = fixture();
    let created = fx.service.create_task(create_input(60)).await.unwrap();
    let v0 = created.task.version.clone();

    let winner = fx
        .service
        .update_task(created.task.id, update_input(&created.task, 90), &v0)
        .await
        .unwrap();
    assert_ne!(winner.task.version, v0);

    let err = fx
        .service
        .update_task(created.task.id, update_input(&created.task, 120), &v0)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ConcurrencyConflict(_)));
}

#[tokio::test]
async fn overdue_task_rejects_update_unless_due_date_moves_to_future() {
    let fx = fixture();
    let task = seed_overdue(&fx, 60, TaskStatus::Open).await;

    let err = fx
        .service
        .update_task(task.id, update_input(&task, -10), &task.version)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidOperation(_)));

    let details = fx
        .service
        .update_task(task.id, update_input(&task, 60), &task.version)
        .await
        .unwrap();
    assert_eq!(details.task.status, TaskStatus::Open);
    assert!(details.task.due_date > Utc::now());
}

#[tokio::test]
async fn status_update_rejects_explicit_overdue() {
    let fx = fixture();
    let created = fx.service.create_task(create_input(60)).await.unwrap();
    let err = fx
        .service
        .update_task_status(created.task.id, TaskStatus::Overdue, &created.task.version)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidOperation(_)));
}

#[tokio::test]
async fn status_update_moves_across_kanban_states() {
    let fx = fixture();
    let created = fx.service.create_task(create_input(60)).await.unwrap();
    let details = fx
        .service
        .update_task_status(
            created.task.id,
            TaskStatus::InProgress,
            &created.task.version,
        )
        .await
        .unwrap();
    assert_eq!(details.task.status, TaskStatus::InProgress);
    assert_ne!(details.task.version, created.task.version);
}

#[tokio::test]
async fn status_update_on_overdue_task_is_rejected() {
    let fx = fixture();
    let task = seed_overdue(&fx, 60, TaskStatus::Open).await;
    let err = fx
        .service
        .update_task_status(task.id, TaskStatus::Completed, &task.version)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidOperation(_)));
}

#[tokio::test]
async fn assignee_update_requires_existing_user() {
    let fx = fixture();
    let created = fx.service.create_task(create_input(60)).await.unwrap();

    let err = fx
        .service
        .update_task_assignee(created.task.id, Some(Uuid::new_v4()), &created.task.version)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let cleared = fx
        .service
        .update_task_assignee(created.task.id, None, &created.task.version)
        .await
        .unwrap();
    assert!(cleared.task.assignee_id.is_none());
    assert!(cleared.assignee.is_none());
}

#[tokio::test]
async fn delete_is_absolute_and_second_delete_is_not_found() {
    let fx = fixture();
    let created = fx.service.create_task(create_input(60)).await.unwrap();

    fx.service.delete_task(created.task.id).await.unwrap();
    let err = fx.service.delete_task(created.task.id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let err = fx.service.get_task(created.task.id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn pagination_totals_cover_every_item_exactly_once() {
    let fx = fixture();
    for i in 0..5 {
        let mut input = create_input(60 + i);
        input.title = format!("task-{i}");
        fx.service.create_task(input).await.unwrap();
    }

    let filter = TaskFilter::default();
    let sort = TaskSort::default();
    let mut seen = 0;
    let mut page_number = 1;
    loop {
        let page = Page::clamped(Some(page_number), Some(2));
        let result = fx.service.list_tasks(&filter, &sort, &page).await.unwrap();
        assert_eq!(result.total_items, 5);
        assert_eq!(result.total_pages, 3);
        seen += result.items.len();
        if page_number as i64 >= result.total_pages {
            break;
        }
        page_number += 1;
    }
    assert_eq!(seen, 5);
}

#[tokio::test]
async fn get_after_update_returns_exactly_what_was_written() {
    let fx = fixture();
    let created = fx.service.create_task(create_input(60)).await.unwrap();

    let mut input = update_input(&created.task, 90);
    input.title = "renamed".into();
    input.priority = TaskPriority::High;
    let updated = fx
        .service
        .update_task(created.task.id, input, &created.task.version)
        .await
        .unwrap();

    let fetched = fx.service.get_task(created.task.id).await.unwrap();
    assert_eq!(fetched.task, updated.task);
}
