use sqlx::{Any, AnyPool};

use crate::db::models::{DashboardSummary, Role, TaskRecord, TaskStatus};
use crate::db::queries::{format_date, today};
use crate::error::AppResult;

const UPCOMING_LIMIT: i64 = 5;

pub async fn summary(pool: &AnyPool) -> AppResult<DashboardSummary> {
    let client_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = ?")
        .bind(Role::Client.as_str())
        .fetch_one(pool)
        .await?;

    let category_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM client_categories")
        .fetch_one(pool)
        .await?;

    let todo_count = count_tasks_by_status(pool, TaskStatus::Todo).await?;
    let in_progress_count = count_tasks_by_status(pool, TaskStatus::InProgress).await?;
    let review_count = count_tasks_by_status(pool, TaskStatus::Review).await?;
    let completed_count = count_tasks_by_status(pool, TaskStatus::Completed).await?;

    let today = format_date(today());

    let overdue_count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM tasks
        WHERE due_date IS NOT NULL AND due_date < ? AND status <> ?
        "#,
    )
    .bind(&today)
    .bind(TaskStatus::Completed.as_str())
    .fetch_one(pool)
    .await?;

    let upcoming = sqlx::query_as::<Any, TaskRecord>(
        r#"
        SELECT id, title, description, status, priority, due_date, allow_comments, created_at, updated_at
        FROM tasks
        WHERE due_date IS NOT NULL AND due_date >= ? AND status <> ?
        ORDER BY due_date ASC, created_at ASC
        LIMIT ?
        "#,
    )
    .bind(&today)
    .bind(TaskStatus::Completed.as_str())
    .bind(UPCOMING_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(DashboardSummary {
        client_count,
        category_count,
        todo_count,
        in_progress_count,
        review_count,
        completed_count,
        overdue_count,
        upcoming,
    })
}

async fn count_tasks_by_status(pool: &AnyPool, status: TaskStatus) -> AppResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE status = ?")
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;

    Ok(count)
}
