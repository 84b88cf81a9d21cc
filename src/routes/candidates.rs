use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;

use crate::{
    dto::candidate_dto::{UpdateStatusPayload, UpdateStatusResponse},
    error::Result,
    services::automation_service::AutomationService,
    utils::token::Claims,
    AppState,
};

#[utoipa::path(
    patch,
    path = "/api/candidates/{id}/status",
    params(("id" = i64, Path, description = "Candidate row ID")),
    responses(
        (status = 200, description = "Pipeline status updated"),
        (status = 403, description = "Candidate of another user"),
        (status = 404, description = "Candidate not found")
    )
)]
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse> {
    let user_id = claims.user_id()?;
    let candidate = state
        .recruiting_service
        .update_candidate_status(user_id, id, payload.status)
        .await?;

    let automation = state.automation_service.clone();
    let event = json!({
        "user_id": user_id,
        "candidate_id": candidate.id,
        "status": candidate.status,
    });
    tokio::spawn(async move {
        automation
            .notify(AutomationService::CANDIDATE_STATUS_CHANGED, &event)
            .await;
    });

    Ok(Json(UpdateStatusResponse {
        success: true,
        candidate,
    }))
}
