use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::api::contact::{
    map_contact_hours, map_contact_info, ContactHoursResponse, ContactInfoResponse,
};
use crate::api::social_media::{map_social_media, SocialMediaResponse};
use crate::api::vacations::{map_vacation, VacationResponse};
use crate::db::queries::{contact, social_media, vacations};
use crate::error::AppResult;
use crate::state::AppState;

/// Served without authentication.
pub fn router() -> Router<AppState> {
    Router::new().route("/public/availability", get(availability))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityResponse {
    contact_hours: Vec<ContactHoursResponse>,
    contact_info: Option<ContactInfoResponse>,
    vacations: Vec<VacationResponse>,
    social_media: Vec<SocialMediaResponse>,
}

async fn availability(State(state): State<AppState>) -> AppResult<Json<AvailabilityResponse>> {
    let contact_hours = contact::list_contact_hours(&state.db, true).await?;
    let contact_info = contact::get_contact_info(&state.db, true).await?;
    let vacations = vacations::list_current_vacations(&state.db).await?;
    let links = social_media::list_social_media(&state.db, true).await?;

    Ok(Json(AvailabilityResponse {
        contact_hours: contact_hours.into_iter().map(map_contact_hours).collect(),
        contact_info: contact_info.map(map_contact_info),
        vacations: vacations.into_iter().map(map_vacation).collect(),
        social_media: links.into_iter().map(map_social_media).collect(),
    }))
}
