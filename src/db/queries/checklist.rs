use sqlx::{Any, AnyPool};

use crate::db::models::ChecklistItemRecord;
use crate::db::queries::tasks::ensure_task_exists;
use crate::db::queries::{new_id, now_timestamp, required_text};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct UpdateChecklistItemInput {
    pub title: Option<String>,
    pub is_completed: Option<bool>,
    pub order: Option<i64>,
}

pub async fn list_items(pool: &AnyPool, task_id: &str) -> AppResult<Vec<ChecklistItemRecord>> {
    let items = sqlx::query_as::<Any, ChecklistItemRecord>(
        r#"
        SELECT id, task_id, title, is_completed, sort_order, created_at, updated_at
        FROM task_checklist_items
        WHERE task_id = ?
        ORDER BY sort_order ASC, created_at ASC
        "#,
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

pub async fn add_item(
    pool: &AnyPool,
    task_id: &str,
    title: &str,
    order: Option<i64>,
) -> AppResult<ChecklistItemRecord> {
    ensure_task_exists(pool, task_id).await?;
    let title = required_text(title, "Le libellé de l'élément est requis")?;
    if order.is_some_and(|value| value < 0) {
        return Err(AppError::bad_request("L'ordre ne peut pas être négatif"));
    }

    let item_id = new_id();
    let now = now_timestamp();
    let mut tx = pool.begin().await?;

    let sort_order = match order {
        Some(value) => value,
        None => {
            sqlx::query_scalar::<Any, i64>(
                "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM task_checklist_items WHERE task_id = ?",
            )
            .bind(task_id)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    sqlx::query(
        r#"
        INSERT INTO task_checklist_items (id, task_id, title, is_completed, sort_order, created_at, updated_at)
        VALUES (?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(&item_id)
    .bind(task_id)
    .bind(&title)
    .bind(sort_order)
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    get_item(pool, task_id, &item_id).await
}

pub async fn get_item(
    pool: &AnyPool,
    task_id: &str,
    item_id: &str,
) -> AppResult<ChecklistItemRecord> {
    sqlx::query_as::<Any, ChecklistItemRecord>(
        r#"
        SELECT id, task_id, title, is_completed, sort_order, created_at, updated_at
        FROM task_checklist_items
        WHERE id = ? AND task_id = ?
        "#,
    )
    .bind(item_id)
    .bind(task_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        AppError::not_found(format!(
            "Élément de checklist '{item_id}' introuvable pour la tâche '{task_id}'"
        ))
    })
}

pub async fn update_item(
    pool: &AnyPool,
    task_id: &str,
    item_id: &str,
    input: UpdateChecklistItemInput,
) -> AppResult<ChecklistItemRecord> {
    let existing = get_item(pool, task_id, item_id).await?;

    let title = match input.title {
        Some(value) => required_text(&value, "Le libellé de l'élément est requis")?,
        None => existing.title,
    };
    let is_completed = input
        .is_completed
        .map(i64::from)
        .unwrap_or(existing.is_completed);
    let sort_order = match input.order {
        Some(value) if value < 0 => {
            return Err(AppError::bad_request("L'ordre ne peut pas être négatif"));
        }
        Some(value) => value,
        None => existing.sort_order,
    };

    sqlx::query(
        r#"
        UPDATE task_checklist_items
        SET title = ?, is_completed = ?, sort_order = ?, updated_at = ?
        WHERE id = ? AND task_id = ?
        "#,
    )
    .bind(&title)
    .bind(is_completed)
    .bind(sort_order)
    .bind(now_timestamp())
    .bind(item_id)
    .bind(task_id)
    .execute(pool)
    .await?;

    get_item(pool, task_id, item_id).await
}

pub async fn delete_item(pool: &AnyPool, task_id: &str, item_id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM task_checklist_items WHERE id = ? AND task_id = ?")
        .bind(item_id)
        .bind(task_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!(
            "Élément de checklist '{item_id}' introuvable pour la tâche '{task_id}'"
        )));
    }

    Ok(())
}
