use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};

use crate::{dto::data_dto::AllDataResponse, error::Result, utils::token::Claims, AppState};

#[utoipa::path(
    get,
    path = "/api/data/all/{user_id}",
    params(("user_id" = i64, Path, description = "Owner of the jobs")),
    responses(
        (status = 200, description = "Jobs and candidates of the user"),
        (status = 403, description = "Data of another user")
    )
)]
#[axum::debug_handler]
pub async fn get_all_data(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse> {
    claims.ensure_user(user_id)?;
    let data = state.recruiting_service.list_for_user(user_id).await?;
    Ok(Json(AllDataResponse {
        success: true,
        jobs: data.jobs,
        candidates: data.candidates,
    }))
}
