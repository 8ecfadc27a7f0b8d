use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::auth::AdminCaller;
use crate::api::{double_option, page, JsonBody};
use crate::db::models::{Role, UserRecord};
use crate::db::queries::optional_text;
use crate::db::queries::users::{self, NewUserInput, UpdateUserInput, UserFilters};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{user_id}",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    role: Option<String>,
    category_id: Option<String>,
    search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateUserRequest {
    email: String,
    name: String,
    role: Option<String>,
    category_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UpdateUserRequest {
    email: Option<String>,
    name: Option<String>,
    role: Option<String>,
    #[serde(deserialize_with = "double_option")]
    category_id: Option<Option<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    id: String,
    email: String,
    name: String,
    role: String,
    category_id: Option<String>,
    category_name: Option<String>,
    created_at: String,
    updated_at: String,
}

async fn list_users(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let (limit, offset) = page(query.limit, query.offset)?;
    let role = optional_text(query.role)
        .map(|value| Role::parse(&value))
        .transpose()?;

    let users = users::list_users(
        &state.db,
        UserFilters {
            role,
            category_id: optional_text(query.category_id),
            search: optional_text(query.search),
        },
        limit,
        offset,
    )
    .await?;

    Ok(Json(users.into_iter().map(map_user).collect()))
}

async fn create_user(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    let role = optional_text(payload.role)
        .map(|value| Role::parse(&value))
        .transpose()?
        .unwrap_or(Role::Client);

    let user = users::create_user(
        &state.db,
        NewUserInput {
            email: payload.email,
            name: payload.name,
            role,
            category_id: optional_text(payload.category_id),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, created_by = %admin.id, "user created");
    Ok((StatusCode::CREATED, Json(map_user(user))))
}

async fn get_user(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = users::get_user(&state.db, &user_id).await?;
    Ok(Json(map_user(user)))
}

async fn update_user(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(user_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    if payload.email.is_none()
        && payload.name.is_none()
        && payload.role.is_none()
        && payload.category_id.is_none()
    {
        return Err(AppError::bad_request("Au moins un champ doit être fourni"));
    }

    let role = payload
        .role
        .map(|value| Role::parse(&value))
        .transpose()?;
    let category_id = payload.category_id.map(optional_text);

    let user = users::update_user(
        &state.db,
        &user_id,
        UpdateUserInput {
            email: payload.email,
            name: payload.name,
            role,
            category_id,
        },
    )
    .await?;

    Ok(Json(map_user(user)))
}

async fn delete_user(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Path(user_id): Path<String>,
) -> AppResult<StatusCode> {
    users::delete_user(&state.db, &user_id, &admin.id).await?;
    tracing::info!(user_id, deleted_by = %admin.id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn map_user(user: UserRecord) -> UserResponse {
    UserResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
        category_id: user.category_id,
        category_name: user.category_name,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}
