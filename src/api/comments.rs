use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::JsonBody;
use crate::api::auth::{ensure_task_access, Caller};
use crate::db::models::CommentRecord;
use crate::db::queries::comments::{self, NewCommentInput};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/tasks/{task_id}/comments",
            get(list_comments).post(add_comment),
        )
        .route(
            "/tasks/{task_id}/comments/{comment_id}",
            delete(delete_comment),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateCommentRequest {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    id: String,
    task_id: String,
    author_id: Option<String>,
    author_name: Option<String>,
    content: String,
    is_from_client: bool,
    created_at: String,
}

async fn list_comments(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(task_id): Path<String>,
) -> AppResult<Json<Vec<CommentResponse>>> {
    ensure_task_access(&state.db, &caller, &task_id).await?;
    let comments = comments::list_comments(&state.db, &task_id).await?;
    Ok(Json(comments.into_iter().map(map_comment).collect()))
}

async fn add_comment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path(task_id): Path<String>,
    JsonBody(payload): JsonBody<CreateCommentRequest>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    let task = ensure_task_access(&state.db, &caller, &task_id).await?;
    let is_from_client = !caller.is_admin();

    if is_from_client && task.allow_comments == 0 {
        return Err(AppError::forbidden(
            "Les commentaires sont désactivés pour cette tâche",
        ));
    }

    let comment = comments::add_comment(
        &state.db,
        &task_id,
        NewCommentInput {
            author_id: caller.id,
            content: payload.content,
            is_from_client,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(map_comment(comment))))
}

async fn delete_comment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Path((task_id, comment_id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    ensure_task_access(&state.db, &caller, &task_id).await?;
    let comment = comments::get_comment(&state.db, &task_id, &comment_id).await?;

    let is_author = comment.author_id.as_deref() == Some(caller.id.as_str());
    if !caller.is_admin() && !is_author {
        return Err(AppError::forbidden(
            "Seul l'auteur peut supprimer ce commentaire",
        ));
    }

    comments::delete_comment(&state.db, &task_id, &comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn map_comment(comment: CommentRecord) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        task_id: comment.task_id,
        author_id: comment.author_id,
        author_name: comment.author_name,
        content: comment.content,
        is_from_client: comment.is_from_client == 1,
        created_at: comment.created_at,
    }
}
