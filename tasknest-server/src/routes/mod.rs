use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::handlers::{health, tasks, users};
use crate::middleware::correlation::propagate_correlation_id;
use crate::state::AppState;

/// Builds the full API router. CORS and tracing layers are applied by the
/// binary so tests can drive this router directly.
pub fn create_api_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/{id}", get(users::get_user))
        .route("/users/email/{email}", get(users::get_user_by_email))
        .route("/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route(
            "/tasks/{id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/tasks/{id}/status", patch(tasks::update_status))
        .route("/tasks/{id}/assignee", patch(tasks::update_assignee))
        .route("/health", get(health::health));

    Router::new()
        .nest("/api/v1", v1)
        .route("/health", get(health::health))
        .layer(middleware::from_fn(propagate_correlation_id))
        .with_state(state)
}
