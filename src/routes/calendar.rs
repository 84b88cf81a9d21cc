use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::google_dto::{CalendarListResponse, CreateEventPayload, CreateEventResponse, UserQuery},
    error::Result,
    utils::token::Claims,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/google/calendar/list-calendars",
    params(("userId" = i64, Query, description = "Calendar owner")),
    responses(
        (status = 200, description = "Calendars the user can write to"),
        (status = 400, description = "Google Calendar not connected")
    )
)]
#[axum::debug_handler]
pub async fn list_calendars(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse> {
    claims.ensure_user(query.user_id)?;
    let calendars = state.scheduling_service.list_calendars(query.user_id).await?;
    Ok(Json(CalendarListResponse {
        success: true,
        calendars,
    }))
}

#[utoipa::path(
    post,
    path = "/api/google/calendar/create-event",
    responses(
        (status = 200, description = "Interview scheduled"),
        (status = 400, description = "Invalid event data or Google Calendar not connected")
    )
)]
#[axum::debug_handler]
pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateEventPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    claims.ensure_user(payload.user_id)?;
    let scheduled = state.scheduling_service.schedule_interview(payload).await?;
    Ok(Json(CreateEventResponse {
        success: true,
        message: "Entrevista agendada com sucesso".into(),
        data: scheduled,
    }))
}
