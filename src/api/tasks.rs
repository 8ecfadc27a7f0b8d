use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::auth::{ensure_task_access, AdminCaller, Caller};
use crate::api::checklist::{map_checklist_item, ChecklistItemResponse};
use crate::api::comments::{map_comment, CommentResponse};
use crate::api::{double_option, page, JsonBody};
use crate::db::models::{
    TaskClientRecord, TaskDetails, TaskHistoryRecord, TaskPriority, TaskStatus, TaskWithClients,
};
use crate::db::queries::history;
use crate::db::queries::tasks::{self, NewTaskInput, TaskFilters, TaskSort, UpdateTaskInput};
use crate::db::queries::{optional_text, parse_date};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{task_id}/history", get(list_history))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskListQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    status: Option<String>,
    priority: Option<String>,
    client_id: Option<String>,
    search: Option<String>,
    sort: Option<String>,
    order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateTaskRequest {
    title: String,
    description: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    due_date: Option<String>,
    allow_comments: Option<bool>,
    client_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UpdateTaskRequest {
    title: Option<String>,
    description: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    #[serde(deserialize_with = "double_option")]
    due_date: Option<Option<String>>,
    allow_comments: Option<bool>,
    client_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskClientResponse {
    id: String,
    name: String,
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskResponse {
    id: String,
    title: String,
    description: String,
    status: String,
    priority: String,
    due_date: Option<String>,
    allow_comments: bool,
    clients: Vec<TaskClientResponse>,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskDetailsResponse {
    #[serde(flatten)]
    task: TaskResponse,
    checklist: Vec<ChecklistItemResponse>,
    comments: Vec<CommentResponse>,
    history: Vec<HistoryEntryResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryEntryResponse {
    id: String,
    task_id: String,
    field: String,
    old_value: Option<String>,
    new_value: Option<String>,
    changed_by_id: Option<String>,
    changed_by_name: Option<String>,
    created_at: String,
}

async fn list_tasks(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(query): Query<TaskListQuery>,
) -> AppResult<Json<Vec<TaskResponse>>> {
    let (limit, offset) = page(query.limit, query.offset)?;

    let filters = TaskFilters {
        status: optional_text(query.status)
            .map(|value| TaskStatus::parse(&value))
            .transpose()?,
        priority: optional_text(query.priority)
            .map(|value| TaskPriority::parse(&value))
            .transpose()?,
        client_id: optional_text(query.client_id),
        search: optional_text(query.search),
        member_id: (!caller.is_admin()).then(|| caller.id.clone()),
        sort: optional_text(query.sort)
            .map(|value| TaskSort::parse(&value))
            .transpose()?
            .unwrap_or_default(),
        descending: is_descending(query.order)?,
    };

    let tasks = tasks::list_tasks(&state.db, filters, limit, offset).await?;
    Ok(Json(tasks.into_iter().map(map_task).collect()))
}

async fn create_task(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    JsonBody(payload): JsonBody<CreateTaskRequest>,
) -> AppResult<(StatusCode, Json<TaskResponse>)> {
    let status = optional_text(payload.status)
        .map(|value| TaskStatus::parse(&value))
        .transpose()?
        .unwrap_or(TaskStatus::Todo);
    let priority = optional_text(payload.priority)
        .map(|value| TaskPriority::parse(&value))
        .transpose()?
        .unwrap_or(TaskPriority::Medium);
    let due_date = optional_text(payload.due_date)
        .map(|value| parse_date(&value, "dueDate"))
        .transpose()?;

    let task = tasks::create_task(
        &state.db,
        NewTaskInput {
            title: payload.title,
            description: payload.description.unwrap_or_default(),
            status,
            priority,
            due_date,
            allow_comments: payload.allow_comments.unwrap_or(true),
            client_ids: payload.client_ids,
        },
    )
    .await?;

    tracing::info!(task_id = %task.task.id, created_by = %admin.id, "task created");
    Ok((StatusCode::CREATED, Json(map_task(task))))
}

async fn get_task(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(task_id): Path<String>,
) -> AppResult<Json<TaskDetailsResponse>> {
    ensure_task_access(&state.db, &caller, &task_id).await?;
    let details = tasks::get_task_details(&state.db, &task_id).await?;
    Ok(Json(map_task_details(details)))
}

async fn update_task(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Path(task_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateTaskRequest>,
) -> AppResult<Json<TaskResponse>> {
    let input = UpdateTaskInput {
        title: payload.title,
        description: payload.description,
        status: payload
            .status
            .map(|value| TaskStatus::parse(&value))
            .transpose()?,
        priority: payload
            .priority
            .map(|value| TaskPriority::parse(&value))
            .transpose()?,
        due_date: payload.due_date.map(parse_optional_due_date).transpose()?,
        allow_comments: payload.allow_comments,
        client_ids: payload.client_ids,
    };

    let task = tasks::update_task(&state.db, &task_id, input, &admin.id).await?;
    Ok(Json(map_task(task)))
}

async fn delete_task(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
    Path(task_id): Path<String>,
) -> AppResult<StatusCode> {
    tasks::delete_task(&state.db, &task_id).await?;
    tracing::info!(task_id, deleted_by = %admin.id, "task deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_history(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(task_id): Path<String>,
) -> AppResult<Json<Vec<HistoryEntryResponse>>> {
    ensure_task_access(&state.db, &caller, &task_id).await?;
    let entries = history::list_task_history(&state.db, &task_id).await?;
    Ok(Json(entries.into_iter().map(map_history_entry).collect()))
}

fn is_descending(order: Option<String>) -> AppResult<bool> {
    match optional_text(order).as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("desc") => Ok(true),
        Some("asc") => Ok(false),
        Some(other) => Err(AppError::bad_request(format!(
            "Ordre de tri invalide '{other}', attendu asc ou desc"
        ))),
    }
}

/// An empty string clears the due date like `null` does.
fn parse_optional_due_date(value: Option<String>) -> AppResult<Option<NaiveDate>> {
    optional_text(value)
        .map(|value| parse_date(&value, "dueDate"))
        .transpose()
}

fn map_client(client: TaskClientRecord) -> TaskClientResponse {
    TaskClientResponse {
        id: client.user_id,
        name: client.name,
        email: client.email,
    }
}

fn map_task(entry: TaskWithClients) -> TaskResponse {
    let TaskWithClients { task, clients } = entry;
    TaskResponse {
        id: task.id,
        title: task.title,
        description: task.description,
        status: task.status,
        priority: task.priority,
        due_date: task.due_date,
        allow_comments: task.allow_comments == 1,
        clients: clients.into_iter().map(map_client).collect(),
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}

fn map_task_details(details: TaskDetails) -> TaskDetailsResponse {
    TaskDetailsResponse {
        task: map_task(TaskWithClients {
            task: details.task,
            clients: details.clients,
        }),
        checklist: details
            .checklist
            .into_iter()
            .map(map_checklist_item)
            .collect(),
        comments: details.comments.into_iter().map(map_comment).collect(),
        history: details.history.into_iter().map(map_history_entry).collect(),
    }
}

fn map_history_entry(entry: TaskHistoryRecord) -> HistoryEntryResponse {
    HistoryEntryResponse {
        id: entry.id,
        task_id: entry.task_id,
        field: entry.field,
        old_value: entry.old_value,
        new_value: entry.new_value,
        changed_by_id: entry.changed_by_id,
        changed_by_name: entry.changed_by_name,
        created_at: entry.created_at,
    }
}
