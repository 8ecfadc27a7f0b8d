use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::JsonBody;
use crate::api::auth::{AdminCaller, Caller};
use crate::db::models::VacationRecord;
use crate::db::queries::parse_date;
use crate::db::queries::vacations::{self, UpdateVacationInput, VacationInput};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/vacations", get(list_vacations).post(create_vacation))
        .route("/vacations/current", get(list_current_vacations))
        .route(
            "/vacations/{vacation_id}",
            get(get_vacation).put(update_vacation).delete(delete_vacation),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VacationListQuery {
    active_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateVacationRequest {
    start_date: String,
    end_date: String,
    title: String,
    description: Option<String>,
    is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UpdateVacationRequest {
    start_date: Option<String>,
    end_date: Option<String>,
    title: Option<String>,
    description: Option<String>,
    is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VacationResponse {
    id: String,
    start_date: String,
    end_date: String,
    title: String,
    description: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

async fn list_vacations(
    State(state): State<AppState>,
    Caller(caller): Caller,
    Query(query): Query<VacationListQuery>,
) -> AppResult<Json<Vec<VacationResponse>>> {
    let active_only = query.active_only.unwrap_or(false) || !caller.is_admin();
    let vacations = vacations::list_vacations(&state.db, active_only).await?;
    Ok(Json(vacations.into_iter().map(map_vacation).collect()))
}

async fn list_current_vacations(
    State(state): State<AppState>,
    _caller: Caller,
) -> AppResult<Json<Vec<VacationResponse>>> {
    let vacations = vacations::list_current_vacations(&state.db).await?;
    Ok(Json(vacations.into_iter().map(map_vacation).collect()))
}

async fn get_vacation(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(vacation_id): Path<String>,
) -> AppResult<Json<VacationResponse>> {
    let vacation = vacations::get_vacation(&state.db, &vacation_id).await?;
    Ok(Json(map_vacation(vacation)))
}

async fn create_vacation(
    State(state): State<AppState>,
    _admin: AdminCaller,
    JsonBody(payload): JsonBody<CreateVacationRequest>,
) -> AppResult<(StatusCode, Json<VacationResponse>)> {
    let vacation = vacations::create_vacation(
        &state.db,
        VacationInput {
            start_date: parse_date(&payload.start_date, "startDate")?,
            end_date: parse_date(&payload.end_date, "endDate")?,
            title: payload.title,
            description: payload.description,
            is_active: payload.is_active.unwrap_or(true),
        },
    )
    .await?;

    tracing::info!(
        vacation_id = %vacation.id,
        start_date = %vacation.start_date,
        end_date = %vacation.end_date,
        "vacation created"
    );
    Ok((StatusCode::CREATED, Json(map_vacation(vacation))))
}

async fn update_vacation(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(vacation_id): Path<String>,
    JsonBody(payload): JsonBody<UpdateVacationRequest>,
) -> AppResult<Json<VacationResponse>> {
    if payload.start_date.is_none()
        && payload.end_date.is_none()
        && payload.title.is_none()
        && payload.description.is_none()
        && payload.is_active.is_none()
    {
        return Err(AppError::bad_request("Au moins un champ doit être fourni"));
    }

    let vacation = vacations::update_vacation(
        &state.db,
        &vacation_id,
        UpdateVacationInput {
            start_date: payload
                .start_date
                .map(|value| parse_date(&value, "startDate"))
                .transpose()?,
            end_date: payload
                .end_date
                .map(|value| parse_date(&value, "endDate"))
                .transpose()?,
            title: payload.title,
            description: payload.description,
            is_active: payload.is_active,
        },
    )
    .await?;

    Ok(Json(map_vacation(vacation)))
}

async fn delete_vacation(
    State(state): State<AppState>,
    _admin: AdminCaller,
    Path(vacation_id): Path<String>,
) -> AppResult<StatusCode> {
    vacations::delete_vacation(&state.db, &vacation_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn map_vacation(vacation: VacationRecord) -> VacationResponse {
    VacationResponse {
        id: vacation.id,
        start_date: vacation.start_date,
        end_date: vacation.end_date,
        title: vacation.title,
        description: vacation.description,
        is_active: vacation.is_active == 1,
        created_at: vacation.created_at,
        updated_at: vacation.updated_at,
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
    async fn overlapping_active_vacations_are_rejected() {
        let (_temp_dir, config) = temp_config("api-vacations");
        let pool = db::connect_and_migrate(&config)
            .await
            .expect("database should initialize");
        seed_admin(&pool).await;
        let member = seed_client(&pool, "client@example.com").await;
        let (base_url, server) = spawn_app(config, pool).await;
        let client = test_client();
        let token = bearer_token(ADMIN_EMAIL);

        let summer = client
            .post(format!("{base_url}/api/v1/vacations"))
            .bearer_auth(&token)
            .json(&json!({
                "startDate": "2099-08-01",
                "endDate": "2099-08-15",
                "title": "Été",
            }))
            .send()
            .await
            .expect("create request should succeed");
        assert_eq!(summer.status(), StatusCode::CREATED);
        let body: Value = summer.json().await.expect("vacation body should parse");
        let summer_id = body["id"]
            .as_str()
            .expect("id should be a string")
            .to_string();

        let overlapping = client
            .post(format!("{base_url}/api/v1/vacations"))
            .bearer_auth(&token)
            .json(&json!({
                "startDate": "2099-08-15",
                "endDate": "2099-08-20",
                "title": "Pont",
            }))
            .send()
            .await
            .expect("overlap request should succeed");
        assert_eq!(overlapping.status(), StatusCode::BAD_REQUEST);

        let inactive = client
            .post(format!("{base_url}/api/v1/vacations"))
            .bearer_auth(&token)
            .json(&json!({
                "startDate": "2099-08-10",
                "endDate": "2099-08-12",
                "title": "Brouillon",
                "isActive": false,
            }))
            .send()
            .await
            .expect("inactive request should succeed");
        assert_eq!(inactive.status(), StatusCode::CREATED);

        let reversed = client
            .post(format!("{base_url}/api/v1/vacations"))
            .bearer_auth(&token)
            .json(&json!({
                "startDate": "2099-09-10",
                "endDate": "2099-09-01",
                "title": "À l'envers",
            }))
            .send()
            .await
            .expect("reversed request should succeed");
        assert_eq!(reversed.status(), StatusCode::BAD_REQUEST);

        let extended = client
            .put(format!("{base_url}/api/v1/vacations/{summer_id}"))
            .bearer_auth(&token)
            .json(&json!({ "endDate": "2099-08-20" }))
            .send()
            .await
            .expect("update request should succeed");
        assert_eq!(extended.status(), StatusCode::OK);

        let member_token = bearer_token(&member.email);
        let as_client = client
            .get(format!("{base_url}/api/v1/vacations"))
            .bearer_auth(&member_token)
            .send()
            .await
            .expect("list request should succeed");
        let body: Value = as_client.json().await.expect("list body should parse");
        assert_eq!(body.as_array().map(Vec::len), Some(1));

        let as_admin = client
            .get(format!("{base_url}/api/v1/vacations"))
            .bearer_auth(&token)
            .send()
            .await
            .expect("admin list request should succeed");
        let body: Value = as_admin.json().await.expect("admin list body should parse");
        assert_eq!(body.as_array().map(Vec::len), Some(2));

        let current = client
            .get(format!("{base_url}/api/v1/vacations/current"))
            .bearer_auth(&member_token)
            .send()
            .await
            .expect("current request should succeed");
        let body: Value = current.json().await.expect("current body should parse");
        assert_eq!(body[0]["endDate"], "2099-08-20");

        let by_client = client
            .delete(format!("{base_url}/api/v1/vacations/{summer_id}"))
            .bearer_auth(&member_token)
            .send()
            .await
            .expect("client delete request should succeed");
        assert_eq!(by_client.status(), StatusCode::FORBIDDEN);

        server.abort();
    }
}
