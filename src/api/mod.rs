pub mod auth;
pub mod categories;
pub mod checklist;
pub mod comments;
pub mod contact;
pub mod dashboard;
pub mod public;
pub mod social_media;
pub mod tasks;
pub mod users;
pub mod vacations;

use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::extract::FromRequest;
use axum::routing::get;
use axum::{middleware, Json, Router};
use serde::{Deserialize, Deserializer, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

/// JSON request body whose rejections are reported with the API error body.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(tasks::router())
        .merge(checklist::router())
        .merge(comments::router())
        .merge(categories::router())
        .merge(contact::router())
        .merge(vacations::router())
        .merge(social_media::router())
        .merge(dashboard::router())
        .merge(public::router())
}

/// Full application with the authentication guard and HTTP layers applied.
pub fn app(state: AppState) -> Router {
    let max_request_body_bytes = state.config.max_request_body_bytes;
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .nest("/api/v1", router())
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_request_body_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let origins: Vec<HeaderValue> = origins
        .iter()
        .map(|origin| origin.trim())
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

#[derive(Debug, Serialize)]
pub struct HealthzResponse {
    pub status: &'static str,
}

pub async fn healthz() -> Json<HealthzResponse> {
    Json(HealthzResponse { status: "ok" })
}

/// Validates `limit`/`offset` query parameters.
pub(crate) fn page(limit: Option<i64>, offset: Option<i64>) -> AppResult<(i64, i64)> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = offset.unwrap_or(0);

    if limit <= 0 {
        return Err(AppError::bad_request("limit doit être supérieur à 0"));
    }

    if limit > MAX_PAGE_SIZE {
        return Err(AppError::bad_request(format!(
            "limit doit être inférieur ou égal à {MAX_PAGE_SIZE}"
        )));
    }

    if offset < 0 {
        return Err(AppError::bad_request("offset ne peut pas être négatif"));
    }

    Ok((limit, offset))
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
