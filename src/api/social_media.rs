use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::JsonBody;
use crate::api::auth::{AdminCaller, Caller};
use crate::db::models::SocialMediaRecord;
use crate::db::queries::social_media::{self, SocialMediaInput, UpdateSocialMediaInput};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/social-media", get(list_links).post(create_link))
        .route(
            "/social-media/{link_id}",
            put(update_link).delete(delete_link),
        )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateLinkRequest {
    platform: String,
    url: String,
    is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UpdateLinkRequest {
    platform: Option<String>,
    url: Option<String>,
    is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialMediaResponse {
    id: String,
    platform: String,
    url: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

async fn list_links(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> AppResult<Json<Vec<SocialMediaResponse>>> {
    let links = social_media::list_social_media(&state.db, !caller.is_admin()).await?;
    Ok(Json(links.into_iter().map(map_social_media).collect()))
}

async fn create_link(
    State(state): State<AppState>,
    _admin: AdminCaller,
    JsonBody(payload): JsonBody<CreateLinkRequest>,
) -> AppResult<(StatusCode, Json<SocialMediaResponse>)> {
    let link = social_media::create_social_media(
        &state.db,
        SocialMediaInput {
            platform: payload.platform,
            url: payload.url,
            is_active: payload.is_active.unwrap_or(true),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(map_social_media(link))))
}

async fn update_link(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(link_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateLinkRequest>,
) -> AppResult<Json<SocialMediaResponse>> {
    if payload.platform.is_none() && payload.url.is_none() && payload.is_active.is_none() {
        return Err(AppError::bad_request("Au moins un champ doit être fourni"));
    }

    let link = social_media::update_social_media(
        &state.db,
        &link_id,
        UpdateSocialMediaInput {
            platform: payload.platform,
            url: payload.url,
            is_active: payload.is_active,
        },
    )
    .await?;

    Ok(Json(map_social_media(link)))
}

async fn delete_link(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(link_id): Path<String>,
) -> AppResult<StatusCode> {
    social_media::delete_social_media(&state.db, &link_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn map_social_media(link: SocialMediaRecord) -> SocialMediaResponse {
    SocialMediaResponse {
        id: link.id,
        platform: link.platform,
        url: link.url,
        is_active: link.is_active == 1,
        created_at: link.created_at,
        updated_at: link.updated_at,
    }
}
