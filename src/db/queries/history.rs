use sqlx::{Any, AnyPool, Transaction};

use crate::db::models::TaskHistoryRecord;
use crate::db::queries::{new_id, now_timestamp};
use crate::error::AppResult;

/// One changed field of a task, as written to `task_history`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Records a change only when the value actually differs.
pub fn diff_field(
    changes: &mut Vec<FieldChange>,
    field: &'static str,
    old_value: Option<String>,
    new_value: Option<String>,
) {
    if old_value != new_value {
        changes.push(FieldChange {
            field,
            old_value,
            new_value,
        });
    }
}

pub async fn insert_changes(
    tx: &mut Transaction<'_, Any>,
    task_id: &str,
    changed_by_id: &str,
    changes: &[FieldChange],
) -> AppResult<()> {
    let now = now_timestamp();
    let revision: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(revision), 0) + 1 FROM task_history WHERE task_id = ?",
    )
    .bind(task_id)
    .fetch_one(&mut **tx)
    .await?;

    for change in changes {
        sqlx::query(
            r#"
            INSERT INTO task_history (id, task_id, field, old_value, new_value, changed_by_id, revision, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(task_id)
        .bind(change.field)
        .bind(change.old_value.as_deref())
        .bind(change.new_value.as_deref())
        .bind(changed_by_id)
        .bind(revision)
        .bind(&now)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

pub async fn list_task_history(pool: &AnyPool, task_id: &str) -> AppResult<Vec<TaskHistoryRecord>> {
    let history = sqlx::query_as::<Any, TaskHistoryRecord>(
        r#"
        SELECT
            h.id,
            h.task_id,
            h.field,
            h.old_value,
            h.new_value,
            h.changed_by_id,
            u.name AS changed_by_name,
            h.created_at
        FROM task_history h
        LEFT JOIN users u ON u.id = h.changed_by_id
        WHERE h.task_id = ?
        ORDER BY h.revision DESC, h.created_at DESC, h.field ASC
        "#,
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;

    Ok(history)
}
