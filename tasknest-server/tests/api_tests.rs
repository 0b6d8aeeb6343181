//! Endpoint tests over the in-memory store: status codes, conditional
//! request handling, error body shape, and pagination math.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use tasknest_core::database::memory::{InMemoryTaskRepository, InMemoryUserRepository};
use tasknest_core::database::ports::UserRepository;
use tasknest_core::domain::{fresh_version, Task, TaskPriority, TaskStatus, User};
use tasknest_server::routes::create_api_router;
use tasknest_server::state::AppState;

fn app() -> (Router, InMemoryTaskRepository, InMemoryUserRepository) {
    let (state, tasks, users) = AppState::in_memory();
    (create_api_router(state), tasks, users)
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    if_match: Option<&str>,
) -> (StatusCode, Value, axum::http::HeaderMap) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = if_match {
        builder = builder.header(header::IF_MATCH, token);
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value, headers)
}

fn create_body(title: &str, due_minutes: i64) -> Value {
    json!({
        "title": title,
        "description": "quarterly report",
        "dueDateUtc": (Utc::now() + Duration::minutes(due_minutes)).to_rfc3339(),
        "priority": "Medium",
        "owner": {
            "fullName": "A",
            "email": "a@x.io",
            "telephone": "+972501234567"
        }
    })
}

fn update_body(due_minutes: i64) -> Value {
    json!({
        "title": "updated",
        "description": "still the report",
        "dueDateUtc": (Utc::now() + Duration::minutes(due_minutes)).to_rfc3339(),
        "priority": "High"
    })
}

/// Seeds an overdue task directly in the store, something the API itself
/// refuses to create.
async fn seed_overdue(
    tasks: &InMemoryTaskRepository,
    users: &InMemoryUserRepository,
) -> Task {
    let owner = users
        .create(&User::new("Grace", "grace@x.io", "+15550100"))
        .await
        .unwrap();
    let now = Utc::now();
    let task = Task {
        id: Uuid::new_v4(),
        title: "late".into(),
        description: String::new(),
        due_date: now - Duration::hours(1),
        priority: TaskPriority::Medium,
        status: TaskStatus::Open,
        owner_id: owner.id,
        assignee_id: Some(owner.id),
        reminder_sent: false,
        due_notified_at: None,
        created_at: now - Duration::hours(2),
        updated_at: now - Duration::hours(2),
        version: fresh_version(),
    };
    tasks.seed(task.clone());
    task
}

#[tokio::test]
async fn health_answers_on_both_paths() {
    let (app, _, _) = app();
    for uri in ["/health", "/api/v1/health"] {
        let (status, body, _) = send_json(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
    }
}

#[tokio::test]
async fn create_task_happy_path() {
    let (app, _, _) = app();
    let (status, body, headers) =
        send_json(&app, "POST", "/api/v1/tasks", Some(create_body("T1", 60)), None).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "Open");
    assert_eq!(body["assignee"]["id"], body["owner"]["id"]);
    assert!(!body["rowVersion"].as_str().unwrap().is_empty());
    assert!(headers.contains_key(header::ETAG));
}

#[tokio::test]
async fn create_task_with_past_due_date_is_rejected() {
    let (app, _, _) = app();
    let (status, body, _) = send_json(
        &app,
        "POST",
        "/api/v1/tasks",
        Some(create_body("T1", -1440)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_OPERATION");
    assert!(body["error"]["correlationId"].is_string());
}

#[tokio::test]
async fn update_without_if_match_is_rejected() {
    let (app, _, _) = app();
    let (_, created, _) =
        send_json(&app, "POST", "/api/v1/tasks", Some(create_body("T1", 60)), None).await;
    let id = created["id"].as_str().unwrap();

    let (status, body, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/tasks/{id}"),
        Some(update_body(90)),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn malformed_if_match_is_rejected() {
    let (app, _, _) = app();
    let (_, created, _) =
        send_json(&app, "POST", "/api/v1/tasks", Some(create_body("T1", 60)), None).await;
    let id = created["id"].as_str().unwrap();

    let (status, body, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/tasks/{id}"),
        Some(update_body(90)),
        Some("%%% not base64 %%%"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn stale_version_surfaces_conflict() {
    let (app, _, _) = app();
    let (_, created, _) =
        send_json(&app, "POST", "/api/v1/tasks", Some(create_body("T1", 60)), None).await;
    let id = created["id"].as_str().unwrap().to_owned();
    let v0 = created["rowVersion"].as_str().unwrap().to_owned();

    let (status, winner, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/tasks/{id}"),
        Some(update_body(90)),
        Some(&v0),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(winner["rowVersion"].as_str().unwrap(), v0);

    let (status, loser, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/tasks/{id}"),
        Some(update_body(120)),
        Some(&v0),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(loser["error"]["code"], "CONCURRENCY_CONFLICT");
}

#[tokio::test]
async fn overdue_task_updates_are_gated_on_future_due_date() {
    let (app, tasks, users) = app();
    let task = seed_overdue(&tasks, &users).await;
    let id = task.id;
    let v0 = base64_encode(&task.version);

    // Moving the due date 10 minutes further into the past stays rejected.
    let (status, body, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/tasks/{id}"),
        Some(update_body(-10)),
        Some(&v0),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_OPERATION");

    // Moving it into the future clears the computed overdue state.
    let (status, body, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/tasks/{id}"),
        Some(update_body(60)),
        Some(&v0),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Open");
}

#[tokio::test]
async fn status_patch_rejects_explicit_overdue() {
    let (app, _, _) = app();
    let (_, created, _) =
        send_json(&app, "POST", "/api/v1/tasks", Some(create_body("T1", 60)), None).await;
    let id = created["id"].as_str().unwrap();
    let v0 = created["rowVersion"].as_str().unwrap();

    let (status, body, _) = send_json(
        &app,
        "PATCH",
        &format!("/api/v1/tasks/{id}/status"),
        Some(json!({"status": "Overdue"})),
        Some(v0),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_OPERATION");
}

#[tokio::test]
async fn status_patch_moves_task_across_board() {
    let (app, _, _) = app();
    let (_, created, _) =
        send_json(&app, "POST", "/api/v1/tasks", Some(create_body("T1", 60)), None).await;
    let id = created["id"].as_str().unwrap();
    let v0 = created["rowVersion"].as_str().unwrap();

    let (status, body, _) = send_json(
        &app,
        "PATCH",
        &format!("/api/v1/tasks/{id}/status"),
        Some(json!({"status": "InProgress"})),
        Some(v0),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "InProgress");
    assert_ne!(body["rowVersion"].as_str().unwrap(), v0);
}

#[tokio::test]
async fn unknown_task_is_not_found() {
    let (app, _, _) = app();
    let (status, body, _) = send_json(
        &app,
        "GET",
        &format!("/api/v1/tasks/{}", Uuid::new_v4()),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn delete_answers_no_content_then_not_found() {
    let (app, _, _) = app();
    let (_, created, _) =
        send_json(&app, "POST", "/api/v1/tasks", Some(create_body("T1", 60)), None).await;
    let id = created["id"].as_str().unwrap();

    let (status, _, _) =
        send_json(&app, "DELETE", &format!("/api/v1/tasks/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) =
        send_json(&app, "DELETE", &format!("/api/v1/tasks/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_pages_sum_to_total() {
    let (app, _, _) = app();
    for i in 0..5 {
        send_json(
            &app,
            "POST",
            "/api/v1/tasks",
            Some(create_body(&format!("task-{i}"), 60 + i)),
            None,
        )
        .await;
    }

    let mut seen = 0;
    for page in 1..=3 {
        let (status, body, _) = send_json(
            &app,
            "GET",
            &format!("/api/v1/tasks?page={page}&pageSize=2"),
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalItems"], 5);
        assert_eq!(body["totalPages"], 3);
        seen += body["items"].as_array().unwrap().len();
    }
    assert_eq!(seen, 5);
}

#[tokio::test]
async fn list_filters_by_status_csv() {
    let (app, _, _) = app();
    let (_, first, _) =
        send_json(&app, "POST", "/api/v1/tasks", Some(create_body("alpha", 60)), None).await;
    send_json(&app, "POST", "/api/v1/tasks", Some(create_body("beta", 90)), None).await;

    let id = first["id"].as_str().unwrap();
    let v0 = first["rowVersion"].as_str().unwrap();
    send_json(
        &app,
        "PATCH",
        &format!("/api/v1/tasks/{id}/status"),
        Some(json!({"status": "InProgress"})),
        Some(v0),
    )
    .await;

    let (status, body, _) = send_json(
        &app,
        "GET",
        "/api/v1/tasks?status=InProgress,Completed",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "alpha");
}

#[tokio::test]
async fn unknown_status_in_filter_is_rejected() {
    let (app, _, _) = app();
    let (status, body, _) =
        send_json(&app, "GET", "/api/v1/tasks?status=Paused", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn duplicate_user_email_is_rejected() {
    let (app, _, _) = app();
    let user = json!({
        "fullName": "A",
        "email": "dup@x.io",
        "telephone": "+15550100"
    });

    let (status, _, _) = send_json(&app, "POST", "/api/v1/users", Some(user.clone()), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body, _) = send_json(&app, "POST", "/api/v1/users", Some(user), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn user_lookup_by_email_normalizes() {
    let (app, _, _) = app();
    let user = json!({
        "fullName": "A",
        "email": "Case@X.io",
        "telephone": "+15550100"
    });
    send_json(&app, "POST", "/api/v1/users", Some(user), None).await;

    let (status, body, _) =
        send_json(&app, "GET", "/api/v1/users/email/case@x.io", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "case@x.io");
}

#[tokio::test]
async fn caller_correlation_id_is_echoed() {
    let (app, _, _) = app();
    let id = Uuid::new_v4().to_string();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .header("x-correlation-id", &id)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        id.as_str()
    );
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    STANDARD.encode(bytes)
}
