use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::JsonBody;
use crate::api::auth::{AdminCaller, Caller};
use crate::db::models::{ContactHoursRecord, ContactInfoRecord};
use crate::db::queries::contact::{
    self, ContactHoursInput, ContactInfoInput, UpdateContactHoursInput,
};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/contact-hours",
            get(list_hours).post(create_hours).put(replace_schedule),
        )
        .route(
            "/contact-hours/{hours_id}",
            put(update_hours).delete(delete_hours),
        )
        .route("/contact-info", get(get_info).put(upsert_info))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ContactHoursRequest {
    day_of_week: Option<i64>,
    start_time: String,
    end_time: String,
    is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UpdateContactHoursRequest {
    day_of_week: Option<i64>,
    start_time: Option<String>,
    end_time: Option<String>,
    is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ContactInfoRequest {
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactHoursResponse {
    id: String,
    day_of_week: i64,
    start_time: String,
    end_time: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfoResponse {
    id: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

/// Clients only see the active slots; the admin also sees disabled ones.
async fn list_hours(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> AppResult<Json<Vec<ContactHoursResponse>>> {
    let hours = contact::list_contact_hours(&state.db, !caller.is_admin()).await?;
    Ok(Json(hours.into_iter().map(map_contact_hours).collect()))
}

async fn create_hours(
    State(state): State<AppState>,
    _admin: AdminCaller,
    JsonBody(payload): JsonBody<ContactHoursRequest>,
) -> AppResult<(StatusCode, Json<ContactHoursResponse>)> {
    let hours = contact::create_contact_hours(&state.db, hours_input(payload)?).await?;
    Ok((StatusCode::CREATED, Json(map_contact_hours(hours))))
}

async fn replace_schedule(
    State(state): State<AppState>,
    _admin: AdminCaller,
    JsonBody(payload): JsonBody<Vec<ContactHoursRequest>>,
) -> AppResult<Json<Vec<ContactHoursResponse>>> {
    let entries = payload
        .into_iter()
        .map(hours_input)
        .collect::<AppResult<Vec<_>>>()?;

    let hours = contact::replace_schedule(&state.db, entries).await?;
    tracing::info!(slots = hours.len(), "contact schedule replaced");
    Ok(Json(hours.into_iter().map(map_contact_hours).collect()))
}

async fn update_hours(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(hours_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateContactHoursRequest>,
) -> AppResult<Json<ContactHoursResponse>> {
    let hours = contact::update_contact_hours(
        &state.db,
        &hours_id,
        UpdateContactHoursInput {
            day_of_week: payload.day_of_week,
            start_time: payload.start_time,
            end_time: payload.end_time,
            is_active: payload.is_active,
        },
    )
    .await?;

    Ok(Json(map_contact_hours(hours)))
}

async fn delete_hours(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(hours_id): Path<String>,
) -> AppResult<StatusCode> {
    contact::delete_contact_hours(&state.db, &hours_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_info(
    State(state): State<AppState>,
    Caller(caller): Caller,
) -> AppResult<Json<ContactInfoResponse>> {
    contact::get_contact_info(&state.db, !caller.is_admin())
        .await?
        .map(|info| Json(map_contact_info(info)))
        .ok_or_else(|| AppError::not_found("Aucune information de contact active"))
}

async fn upsert_info(
    State(state): State<AppState>,
    _admin: AdminCaller,
    JsonBody(payload): JsonBody<ContactInfoRequest>,
) -> AppResult<Json<ContactInfoResponse>> {
    let info = contact::upsert_contact_info(
        &state.db,
        ContactInfoInput {
            phone: payload.phone,
            email: payload.email,
            address: payload.address,
            is_active: payload.is_active,
        },
    )
    .await?;

    Ok(Json(map_contact_info(info)))
}

fn hours_input(payload: ContactHoursRequest) -> AppResult<ContactHoursInput> {
    let day_of_week = payload
        .day_of_week
        .ok_or_else(|| AppError::bad_request("Le jour de la semaine est requis"))?;

    Ok(ContactHoursInput {
        day_of_week,
        start_time: payload.start_time,
        end_time: payload.end_time,
        is_active: payload.is_active.unwrap_or(true),
    })
}

pub(crate) fn map_contact_hours(hours: ContactHoursRecord) -> ContactHoursResponse {
    ContactHoursResponse {
        id: hours.id,
        day_of_week: hours.day_of_week,
        start_time: hours.start_time,
        end_time: hours.end_time,
        is_active: hours.is_active == 1,
        created_at: hours.created_at,
        updated_at: hours.updated_at,
    }
}

pub(crate) fn map_contact_info(info: ContactInfoRecord) -> ContactInfoResponse {
    ContactInfoResponse {
        id: info.id,
        phone: info.phone,
        email: info.email,
        address: info.address,
        is_active: info.is_active == 1,
        created_at: info.created_at,
        updated_at: info.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    use crate::db;
    use crate::testing::{
        bearer_token, seed_admin, seed_client, spawn_app, temp_config, test_client, ADMIN_EMAIL,
    };

    #[tokio::test]
    async fn schedule_replacement_and_contact_info() {
        let (_temp_dir, config) = temp_config("api-contact");
        let pool = db::connect_and_migrate(&config)
            .await
            .expect("database should initialize");
        seed_admin(&pool).await;
        let member = seed_client(&pool, "client@example.com").await;
        let (base_url, server) = spawn_app(config, pool).await;
        let client = test_client();
        let token = bearer_token(ADMIN_EMAIL);

        let missing_info = client
            .get(format!("{base_url}/api/v1/contact-info"))
            .bearer_auth(bearer_token(&member.email))
            .send()
            .await
            .expect("info request should succeed");
        assert_eq!(missing_info.status(), StatusCode::NOT_FOUND);

        let duplicate_day = client
            .put(format!("{base_url}/api/v1/contact-hours"))
            .bearer_auth(&token)
            .json(&json!([
                { "dayOfWeek": 1, "startTime": "09:00", "endTime": "12:00" },
                { "dayOfWeek": 1, "startTime": "14:00", "endTime": "18:00" },
            ]))
            .send()
            .await
            .expect("schedule request should succeed");
        assert_eq!(duplicate_day.status(), StatusCode::BAD_REQUEST);

        let replaced = client
            .put(format!("{base_url}/api/v1/contact-hours"))
            .bearer_auth(&token)
            .json(&json!([
                { "dayOfWeek": 2, "startTime": "09:00", "endTime": "17:00" },
                { "dayOfWeek": 1, "startTime": "09:00", "endTime": "12:00" },
                { "dayOfWeek": 3, "startTime": "10:00", "endTime": "16:00", "isActive": false },
            ]))
            .send()
            .await
            .expect("schedule request should succeed");
        assert_eq!(replaced.status(), StatusCode::OK);
        let body: Value = replaced.json().await.expect("schedule body should parse");
        assert_eq!(body.as_array().map(Vec::len), Some(3));
        assert_eq!(body[0]["dayOfWeek"], 1);

        let reversed = client
            .post(format!("{base_url}/api/v1/contact-hours"))
            .bearer_auth(&token)
            .json(&json!({ "dayOfWeek": 4, "startTime": "18:00", "endTime": "09:00" }))
            .send()
            .await
            .expect("create request should succeed");
        assert_eq!(reversed.status(), StatusCode::BAD_REQUEST);

        let as_client = client
            .get(format!("{base_url}/api/v1/contact-hours"))
            .bearer_auth(bearer_token(&member.email))
            .send()
            .await
            .expect("list request should succeed");
        let body: Value = as_client.json().await.expect("list body should parse");
        assert_eq!(body.as_array().map(Vec::len), Some(2));

        let saved = client
            .put(format!("{base_url}/api/v1/contact-info"))
            .bearer_auth(&token)
            .json(&json!({ "phone": "01 23 45 67 89", "email": "Contact@Aurore.example" }))
            .send()
            .await
            .expect("info update should succeed");
        assert_eq!(saved.status(), StatusCode::OK);
        let body: Value = saved.json().await.expect("info body should parse");
        assert_eq!(body["email"], "contact@aurore.example");
        assert_eq!(body["isActive"], true);

        let visible = client
            .get(format!("{base_url}/api/v1/contact-info"))
            .bearer_auth(bearer_token(&member.email))
            .send()
            .await
            .expect("info request should succeed");
        assert_eq!(visible.status(), StatusCode::OK);

        server.abort();
    }
}
