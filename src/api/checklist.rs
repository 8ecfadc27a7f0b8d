use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::JsonBody;
use crate::api::auth::{ensure_task_access, AdminCaller, Caller};
use crate::db::models::ChecklistItemRecord;
use crate::db::queries::checklist::{self, UpdateChecklistItemInput};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/tasks/{task_id}/checklist",
            get(list_items).post(add_item),
        )
        .route(
            "/tasks/{task_id}/checklist/{item_id}",
            put(update_item).delete(delete_item),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateItemRequest {
    title: String,
    order: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UpdateItemRequest {
    title: Option<String>,
    is_completed: Option<bool>,
    order: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItemResponse {
    id: String,
    task_id: String,
    title: String,
    is_completed: bool,
    order: i64,
    created_at: String,
    updated_at: String,
}

async fn list_items(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(task_id): Path<String>,
) -> AppResult<Json<Vec<ChecklistItemResponse>>> {
    ensure_task_access(&state.db, &caller, &task_id).await?;
    let items = checklist::list_items(&state.db, &task_id).await?;
    Ok(Json(items.into_iter().map(map_checklist_item).collect()))
}

async fn add_item(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(task_id): Path<String>,
    JsonBody(payload): JsonBody<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<ChecklistItemResponse>)> {
    let item = checklist::add_item(&state.db, &task_id, &payload.title, payload.order).await?;
    Ok((StatusCode::CREATED, Json(map_checklist_item(item))))
}

/// Clients assigned to the task may only tick or untick an item.
async fn update_item(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path((task_id, item_id)): Path<(String, String)>,
    JsonBody(payload): JsonBody<UpdateItemRequest>,
) -> AppResult<Json<ChecklistItemResponse>> {
    ensure_task_access(&state.db, &caller, &task_id).await?;

    if !caller.is_admin() && (payload.title.is_some() || payload.order.is_some()) {
        return Err(AppError::forbidden(
            "Seul l'état de l'élément peut être modifié",
        ));
    }

    if payload.title.is_none() && payload.is_completed.is_none() && payload.order.is_none() {
        return Err(AppError::bad_request("Au moins un champ doit être fourni"));
    }

    let item = checklist::update_item(
        &state.db,
        &task_id,
        &item_id,
        UpdateChecklistItemInput {
            title: payload.title,
            is_completed: payload.is_completed,
            order: payload.order,
        },
    )
    .await?;

    Ok(Json(map_checklist_item(item)))
}

async fn delete_item(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path((task_id, item_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    checklist::delete_item(&state.db, &task_id, &item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn map_checklist_item(item: ChecklistItemRecord) -> ChecklistItemResponse {
    ChecklistItemResponse {
        id: item.id,
        task_id: item.task_id,
        title: item.title,
        is_completed: item.is_completed == 1,
        order: item.sort_order,
        created_at: item.created_at,
        updated_at: item.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    use crate::db;
    use crate::testing::{
        bearer_token, seed_admin, seed_client, seed_task, spawn_app, temp_config, test_client,
        ADMIN_EMAIL,
    };

    #[tokio::test]
    async fn members_toggle_items_but_cannot_rename_them() {
        let (_temp_dir, config) = temp_config("api-checklist");
        let pool = db::connect_and_migrate(&config)
            .await
            .expect("database should initialize");
        seed_admin(&pool).await;
        let member = seed_client(&pool, "membre@example.com").await;
        let outsider = seed_client(&pool, "autre@example.com").await;
        let task = seed_task(&pool, "Identité visuelle", &[member.id.clone()]).await;
        let (base_url, server) = spawn_app(config, pool).await;
        let client = test_client();
        let items_url = format!("{base_url}/api/v1/tasks/{}/checklist", task.task.id);

        let created = client
            .post(&items_url)
            .bearer_auth(bearer_token(ADMIN_EMAIL))
            .json(&json!({ "title": "Valider la palette" }))
            .send()
            .await
            .expect("create request should succeed");
        assert_eq!(created.status(), StatusCode::CREATED);
        let body: Value = created.json().await.expect("item body should parse");
        assert_eq!(body["order"], 0);
        assert_eq!(body["isCompleted"], false);
        let item_url = format!(
            "{items_url}/{}",
            body["id"].as_str().expect("id should be a string")
        );

        let member_token = bearer_token(&member.email);
        let member_add = client
            .post(&items_url)
            .bearer_auth(&member_token)
            .json(&json!({ "title": "Ajout client" }))
            .send()
            .await
            .expect("member create request should succeed");
        assert_eq!(member_add.status(), StatusCode::FORBIDDEN);

        let renamed = client
            .put(&item_url)
            .bearer_auth(&member_token)
            .json(&json!({ "title": "Autre chose" }))
            .send()
            .await
            .expect("rename request should succeed");
        assert_eq!(renamed.status(), StatusCode::FORBIDDEN);

        let toggled = client
            .put(&item_url)
            .bearer_auth(&member_token)
            .json(&json!({ "isCompleted": true }))
            .send()
            .await
            .expect("toggle request should succeed");
        assert_eq!(toggled.status(), StatusCode::OK);
        let body: Value = toggled.json().await.expect("toggled body should parse");
        assert_eq!(body["isCompleted"], true);
        assert_eq!(body["title"], "Valider la palette");

        let outsider_toggle = client
            .put(&item_url)
            .bearer_auth(bearer_token(&outsider.email))
            .json(&json!({ "isCompleted": false }))
            .send()
            .await
            .expect("outsider request should succeed");
        assert_eq!(outsider_toggle.status(), StatusCode::FORBIDDEN);

        let deleted = client
            .delete(&item_url)
            .bearer_auth(bearer_token(ADMIN_EMAIL))
            .send()
            .await
            .expect("delete request should succeed");
        assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

        server.abort();
    }
}
