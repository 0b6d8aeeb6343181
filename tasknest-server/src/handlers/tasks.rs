use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use uuid::Uuid;

use tasknest_core::query::Paged;

use crate::dto::{
    AssigneeUpdateRequest, StatusUpdateRequest, TaskCreateRequest, TaskListQuery,
    TaskResponse, TaskUpdateRequest,
};
use crate::errors::{ApiError, ApiResult};
use crate::handlers::expected_version;
use crate::middleware::correlation::CorrelationId;
use crate::state::AppState;

/// Single-task responses carry the version token both in the body and as an
/// `ETag`, so clients can lift it straight into `If-Match`.
fn task_response(status: StatusCode, body: TaskResponse) -> Response {
    let etag = format!("\"{}\"", body.row_version);
    (status, [(header::ETAG, etag)], Json(body)).into_response()
}

fn correlate(err: impl Into<ApiError>, correlation: CorrelationId) -> ApiError {
    err.into().with_correlation(correlation.0)
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(body): Json<TaskCreateRequest>,
) -> ApiResult<Response> {
    let details = state
        .tasks
        .create_task(body.into())
        .await
        .map_err(|e| correlate(e, correlation))?;
    Ok(task_response(StatusCode::CREATED, details.into()))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let details = state
        .tasks
        .get_task(id)
        .await
        .map_err(|e| correlate(e, correlation))?;
    Ok(task_response(StatusCode::OK, details.into()))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Query(query): Query<TaskListQuery>,
) -> ApiResult<Json<Paged<TaskResponse>>> {
    let (filter, sort, page) = query
        .into_parts()
        .map_err(|e| correlate(e, correlation))?;
    let result = state
        .tasks
        .list_tasks(&filter, &sort, &page)
        .await
        .map_err(|e| correlate(e, correlation))?;
    Ok(Json(result.map(TaskResponse::from)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<TaskUpdateRequest>,
) -> ApiResult<Response> {
    let version = expected_version(&headers).map_err(|e| correlate(e, correlation))?;
    let details = state
        .tasks
        .update_task(id, body.into(), &version)
        .await
        .map_err(|e| correlate(e, correlation))?;
    Ok(task_response(StatusCode::OK, details.into()))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<StatusUpdateRequest>,
) -> ApiResult<Response> {
    let version = expected_version(&headers).map_err(|e| correlate(e, correlation))?;
    let details = state
        .tasks
        .update_task_status(id, body.status, &version)
        .await
        .map_err(|e| correlate(e, correlation))?;
    Ok(task_response(StatusCode::OK, details.into()))
}

pub async fn update_assignee(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<AssigneeUpdateRequest>,
) -> ApiResult<Response> {
    let version = expected_version(&headers).map_err(|e| correlate(e, correlation))?;
    let details = state
        .tasks
        .update_task_assignee(id, body.assigned_user_id, &version)
        .await
        .map_err(|e| correlate(e, correlation))?;
    Ok(task_response(StatusCode::OK, details.into()))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .tasks
        .delete_task(id)
        .await
        .map_err(|e| correlate(e, correlation))?;
    Ok(StatusCode::NO_CONTENT)
}
