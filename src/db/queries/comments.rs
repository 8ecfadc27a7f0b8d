use sqlx::{Any, AnyPool};

use crate::db::models::CommentRecord;
use crate::db::queries::tasks::ensure_task_exists;
use crate::db::queries::{new_id, now_timestamp, required_text};
use crate::error::{AppError, AppResult};

const COMMENT_SELECT: &str = r#"
    SELECT
        c.id,
        c.task_id,
        c.author_id,
        u.name AS author_name,
        c.content,
        c.is_from_client,
        c.created_at
    FROM task_comments c
    LEFT JOIN users u ON u.id = c.author_id
"#;

#[derive(Debug, Clone)]
pub struct NewCommentInput {
    pub author_id: String,
    pub content: String,
    pub is_from_client: bool,
}

pub async fn list_comments(pool: &AnyPool, task_id: &str) -> AppResult<Vec<CommentRecord>> {
    let comments = sqlx::query_as::<Any, CommentRecord>(&format!(
        "{COMMENT_SELECT} WHERE c.task_id = ? ORDER BY c.created_at ASC, c.id ASC"
    ))
    .bind(task_id)
    .fetch_all(pool)
    .await?;

    Ok(comments)
}

pub async fn get_comment(
    pool: &AnyPool,
    task_id: &str,
    comment_id: &str,
) -> AppResult<CommentRecord> {
    sqlx::query_as::<Any, CommentRecord>(&format!(
        "{COMMENT_SELECT} WHERE c.id = ? AND c.task_id = ?"
    ))
    .bind(comment_id)
    .bind(task_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Commentaire '{comment_id}' introuvable")))
}

pub async fn add_comment(
    pool: &AnyPool,
    task_id: &str,
    input: NewCommentInput,
) -> AppResult<CommentRecord> {
    ensure_task_exists(pool, task_id).await?;
    let content = required_text(&input.content, "Le commentaire ne peut pas être vide")?;

    let comment_id = new_id();
    sqlx::query(
        r#"
        INSERT INTO task_comments (id, task_id, author_id, content, is_from_client, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&comment_id)
    .bind(task_id)
    .bind(&input.author_id)
    .bind(&content)
    .bind(i64::from(input.is_from_client))
    .bind(now_timestamp())
    .execute(pool)
    .await?;

    get_comment(pool, task_id, &comment_id).await
}

pub async fn delete_comment(pool: &AnyPool, task_id: &str, comment_id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM task_comments WHERE id = ? AND task_id = ?")
        .bind(comment_id)
        .bind(task_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!(
            "Commentaire '{comment_id}' introuvable"
        )));
    }

    Ok(())
}
