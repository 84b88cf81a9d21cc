use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::job_dto::{Acknowledgement, CreateJobPayload, UpdateJobPayload},
    error::Result,
    utils::token::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/jobs",
    responses(
        (status = 201, description = "Job created for the authenticated user"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state
        .recruiting_service
        .create_job(claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[utoipa::path(
    patch,
    path = "/api/jobs/{id}",
    params(("id" = i64, Path, description = "Job row ID")),
    responses(
        (status = 200, description = "Job updated"),
        (status = 403, description = "Job of another user"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn update_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state
        .recruiting_service
        .update_job(claims.user_id()?, id, payload)
        .await?;
    Ok(Json(job))
}

#[utoipa::path(
    delete,
    path = "/api/jobs/{id}",
    params(("id" = i64, Path, description = "Job row ID")),
    responses(
        (status = 200, description = "Job deleted"),
        (status = 403, description = "Job of another user"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state
        .recruiting_service
        .delete_job(claims.user_id()?, id)
        .await?;
    Ok(Json(Acknowledgement {
        success: true,
        message: Some("Job deleted".into()),
    }))
}
