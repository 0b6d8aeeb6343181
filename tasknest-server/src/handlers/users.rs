use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use tasknest_core::query::{Page, Paged};
use tasknest_core::service::CreateUserInput;

use crate::dto::{UserCreateRequest, UserListQuery, UserResponse};
use crate::errors::{ApiError, ApiResult};
use crate::middleware::correlation::CorrelationId;
use crate::state::AppState;

pub async fn create_user(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Json(body): Json<UserCreateRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let user = state
        .users
        .create_user(CreateUserInput {
            full_name: body.full_name,
            email: body.email,
            telephone: body.telephone,
        })
        .await
        .map_err(|e| ApiError::from(e).with_correlation(correlation.0))?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .users
        .get_user(id)
        .await
        .map_err(|e| ApiError::from(e).with_correlation(correlation.0))?;
    Ok(Json(user.into()))
}

pub async fn get_user_by_email(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Path(email): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .users
        .get_user_by_email(&email)
        .await
        .map_err(|e| ApiError::from(e).with_correlation(correlation.0))?;
    Ok(Json(user.into()))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<Paged<UserResponse>>> {
    let page = Page::clamped(query.page, query.page_size);
    let result = state
        .users
        .list_users(query.search.as_deref(), &page)
        .await
        .map_err(|e| ApiError::from(e).with_correlation(correlation.0))?;
    Ok(Json(result.map(UserResponse::from)))
}
