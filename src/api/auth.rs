use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use jsonwebtoken::decode;
use serde::Deserialize;
use sqlx::AnyPool;

use crate::api::JsonBody;
use crate::api::users::{map_user, UserResponse};
use crate::db::models::{Role, TaskRecord, UserRecord};
use crate::db::queries::users::{self, NewUserInput};
use crate::db::queries::{normalize_email, tasks};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

const PROFILE_PATH: &str = "/api/v1/auth/profile";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/profile", post(complete_profile))
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    email: Option<String>,
}

/// Identity resolved from a verified token. `user` is `None` until the profile is completed.
#[derive(Debug, Clone)]
pub struct Identity {
    pub email: String,
    pub user: Option<UserRecord>,
}

/// Any signed-in user with a profile.
#[derive(Debug, Clone)]
pub struct Caller(pub UserRecord);

/// A signed-in user with the ADMIN role.
#[derive(Debug, Clone)]
pub struct AdminCaller(pub UserRecord);

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> AppResult<Response> {
    if is_public_path(request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .ok_or(AppError::Unauthorized)?;

    let claims = decode::<TokenClaims>(
        token,
        &state.token_verifier.key,
        &state.token_verifier.validation,
    )
    .map_err(|error| {
        tracing::debug!(%error, "rejected bearer token");
        AppError::Unauthorized
    })?
    .claims;

    let email = claims
        .email
        .as_deref()
        .and_then(|email| normalize_email(email).ok())
        .ok_or(AppError::Unauthorized)?;
    let user = users::find_user_by_email(&state.db, &email).await?;

    if user.is_none() && request.uri().path() != PROFILE_PATH {
        return Err(AppError::Unauthorized);
    }

    request.extensions_mut().insert(Identity { email, user });
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Identity::from_request_parts(parts, state)
            .await?
            .user
            .map(Caller)
            .ok_or(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for AdminCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Caller(user) = Caller::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::forbidden("Accès réservé à l'administration"));
        }
        Ok(AdminCaller(user))
    }
}

/// Admins reach every task; clients only the tasks they are assigned to.
pub async fn ensure_task_access(
    pool: &AnyPool,
    caller: &UserRecord,
    task_id: &str,
) -> AppResult<TaskRecord> {
    let task = tasks::get_task(pool, task_id).await?;
    if caller.is_admin() || tasks::is_task_member(pool, task_id, &caller.id).await? {
        return Ok(task);
    }

    Err(AppError::forbidden("Vous n'avez pas accès à cette tâche"))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompleteProfileRequest {
    name: String,
}

async fn me(Caller(user): Caller) -> Json<UserResponse> {
    Json(map_user(user))
}

async fn complete_profile(
    State(state): State<AppState>,
    identity: Identity,
    JsonBody(payload): JsonBody<CompleteProfileRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    if identity.user.is_some() {
        return Err(AppError::Conflict(
            "Un profil existe déjà pour ce compte".to_string(),
        ));
    }

    let role = if state.config.auth.is_admin_email(&identity.email) {
        Role::Admin
    } else {
        Role::Client
    };

    let user = users::create_user(
        &state.db,
        NewUserInput {
            email: identity.email,
            name: payload.name,
            role,
            category_id: None,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = role.as_str(), "profile completed");
    Ok((StatusCode::CREATED, Json(map_user(user))))
}

fn is_public_path(path: &str) -> bool {
    path == "/healthz" || path.starts_with("/api/v1/public/")
}

fn parse_bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }

    Some(token)
}
