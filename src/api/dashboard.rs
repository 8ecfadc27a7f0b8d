use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::api::auth::AdminCaller;
use crate::db::models::{DashboardSummary, TaskRecord};
use crate::db::queries::dashboard;
use crate::error::AppResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(summary))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardResponse {
    client_count: i64,
    category_count: i64,
    tasks_by_status: StatusCounts,
    overdue_count: i64,
    upcoming: Vec<UpcomingTaskResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct StatusCounts {
    todo: i64,
    in_progress: i64,
    review: i64,
    completed: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpcomingTaskResponse {
    id: String,
    title: String,
    status: String,
    priority: String,
    due_date: Option<String>,
}

async fn summary(
    State(state): State<AppState>,
    _admin: AdminCaller,
) -> AppResult<Json<DashboardResponse>> {
    let summary = dashboard::summary(&state.db).await?;
    Ok(Json(map_summary(summary)))
}

fn map_summary(summary: DashboardSummary) -> DashboardResponse {
    DashboardResponse {
        client_count: summary.client_count,
        category_count: summary.category_count,
        tasks_by_status: StatusCounts {
            todo: summary.todo_count,
            in_progress: summary.in_progress_count,
            review: summary.review_count,
            completed: summary.completed_count,
        },
        overdue_count: summary.overdue_count,
        upcoming: summary.upcoming.into_iter().map(map_upcoming).collect(),
    }
}

fn map_upcoming(task: TaskRecord) -> UpcomingTaskResponse {
    UpcomingTaskResponse {
        id: task.id,
        title: task.title,
        status: task.status,
        priority: task.priority,
        due_date: task.due_date,
    }
}
