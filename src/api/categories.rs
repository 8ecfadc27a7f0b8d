use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::JsonBody;
use crate::api::auth::AdminCaller;
use crate::db::models::CategoryRecord;
use crate::db::queries::categories::{self, CategoryInput, UpdateCategoryInput};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{category_id}",
            put(update_category).delete(delete_category),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateCategoryRequest {
    name: String,
    description: Option<String>,
    color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpdateCategoryRequest {
    name: Option<String>,
    description: Option<String>,
    color: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryResponse {
    id: String,
    name: String,
    description: String,
    color: String,
    client_count: i64,
    created_at: String,
    updated_at: String,
}

async fn list_categories(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> AppResult<Json<Vec<CategoryResponse>>> {
    let categories = categories::list_categories(&state.db).await?;
    Ok(Json(categories.into_iter().map(map_category).collect()))
}

async fn create_category(
    State(state): State<AppState>,
    _admin: AdminCaller,
    JsonBody(payload): JsonBody<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<CategoryResponse>)> {
    let category = categories::create_category(
        &state.db,
        CategoryInput {
            name: payload.name,
            description: payload.description,
            color: payload.color,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(map_category(category))))
}

async fn update_category(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(category_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateCategoryRequest>,
) -> AppResult<Json<CategoryResponse>> {
    if payload.name.is_none() && payload.description.is_none() && payload.color.is_none() {
        return Err(AppError::bad_request("Au moins un champ doit être fourni"));
    }

    let category = categories::update_category(
        &state.db,
        &category_id,
        UpdateCategoryInput {
            name: payload.name,
            description: payload.description,
            color: payload.color,
        },
    )
    .await?;

    Ok(Json(map_category(category)))
}

async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(category_id): Path<String>,
) -> AppResult<StatusCode> {
    categories::delete_category(&state.db, &category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn map_category(category: CategoryRecord) -> CategoryResponse {
    CategoryResponse {
        id: category.id,
        name: category.name,
        description: category.description,
        color: category.color,
        client_count: category.client_count,
        created_at: category.created_at,
        updated_at: category.updated_at,
    }
}
