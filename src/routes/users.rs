use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};

use crate::{error::Result, utils::token::Claims, AppState};

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User row ID")),
    responses(
        (status = 200, description = "User profile"),
        (status = 403, description = "Profile of another user"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn get_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    claims.ensure_user(id)?;
    let profile = state.user_service.get_profile(id).await?;
    Ok(Json(profile))
}
