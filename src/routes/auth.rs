use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::auth_dto::{AuthResponse, LoginPayload, SignUpPayload},
    error::Result,
    utils::token::issue_session_token,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    responses(
        (status = 201, description = "User registered, session token issued"),
        (status = 400, description = "Invalid payload or email already registered")
    )
)]
#[axum::debug_handler]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.sign_up(payload).await?;
    let token = issue_session_token(
        user.id,
        &state.config.jwt_secret,
        state.config.session_ttl_hours,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user,
            token,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    responses(
        (status = 200, description = "Credentials accepted, session token issued"),
        (status = 401, description = "Invalid email or password")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state.user_service.login(payload).await?;
    let token = issue_session_token(
        user.id,
        &state.config.jwt_secret,
        state.config.session_ttl_hours,
    )?;
    Ok(Json(AuthResponse {
        success: true,
        user,
        token,
    }))
}
