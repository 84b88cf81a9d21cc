use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Json},
    Extension,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    dto::google_dto::{CallbackQuery, ConnectResponse, DisconnectPayload, UserQuery},
    dto::job_dto::Acknowledgement,
    error::{Error, Result},
    utils::{
        oauth_state::{sign_state, verify_state},
        token::Claims,
    },
    AppState,
};

/// Tag the opener listens for; see `client::google::OAuthCompletion`.
pub const OAUTH_MESSAGE_SOURCE: &str = "ats-google-oauth";

#[utoipa::path(
    get,
    path = "/api/google/auth/connect",
    params(("userId" = i64, Query, description = "User to connect")),
    responses((status = 200, description = "Google authorization URL"))
)]
#[axum::debug_handler]
pub async fn connect(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse> {
    claims.ensure_user(query.user_id)?;
    let oauth_state = sign_state(query.user_id, &state.config.jwt_secret)?;
    let url = state.google_service.authorization_url(&oauth_state)?;
    Ok(Json(ConnectResponse { url }))
}

/// Landing page of the OAuth popup. Always answers with HTML that reports
/// the outcome to the opener window and closes itself.
#[utoipa::path(
    get,
    path = "/api/google/auth/callback",
    responses((status = 200, description = "Popup page reporting the outcome"))
)]
#[axum::debug_handler]
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Html<String> {
    match complete_authorization(&state, query).await {
        Ok(user_id) => {
            info!(user_id, "Google Calendar connected");
            popup_page(&state.config.frontend_url, "connected", None)
        }
        Err(err) => {
            error!(error = %err, "Google authorization failed");
            popup_page(&state.config.frontend_url, "error", Some(&err.to_string()))
        }
    }
}

async fn complete_authorization(state: &AppState, query: CallbackQuery) -> Result<i64> {
    if let Some(reason) = query.error {
        return Err(Error::BadRequest(format!("Authorization denied: {}", reason)));
    }
    let code = query
        .code
        .ok_or_else(|| Error::BadRequest("Missing authorization code".into()))?;
    let user_id = verify_state(
        query.state.as_deref().unwrap_or_default(),
        &state.config.jwt_secret,
    )?;

    let grant = state.google_service.exchange_code(&code).await?;
    let refresh_token = grant.refresh_token.ok_or_else(|| {
        Error::BadRequest("Google did not return a refresh token, remove the app access and retry".into())
    })?;
    state
        .user_service
        .set_refresh_token(user_id, Some(&refresh_token))
        .await?;
    Ok(user_id)
}

fn popup_page(frontend_url: &str, status: &str, message: Option<&str>) -> Html<String> {
    let payload = json!({
        "source": OAUTH_MESSAGE_SOURCE,
        "status": status,
        "message": message,
    });
    let target = json!(frontend_url.trim_end_matches('/'));
    // JSON is valid JS; escaping `<` keeps it from closing the script tag.
    let escape = |value: serde_json::Value| value.to_string().replace('<', "\\u003c");
    let title = if status == "connected" {
        "Google Calendar conectado"
    } else {
        "Falha ao conectar o Google Calendar"
    };

    Html(format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<p>{title}. Esta janela pode ser fechada.</p>
<script>
  if (window.opener) {{
    window.opener.postMessage({payload}, {target});
  }}
  window.close();
</script>
</body>
</html>"#,
        title = title,
        payload = escape(payload),
        target = escape(target),
    ))
}

#[utoipa::path(
    post,
    path = "/api/google/auth/disconnect",
    responses((status = 200, description = "Stored Google credential cleared"))
)]
#[axum::debug_handler]
pub async fn disconnect(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<DisconnectPayload>,
) -> Result<impl IntoResponse> {
    claims.ensure_user(payload.user_id)?;

    if let Some(token) = state.user_service.refresh_token(payload.user_id).await? {
        if let Err(err) = state.google_service.revoke(&token).await {
            warn!(error = %err, user_id = payload.user_id, "Google token revocation failed");
        }
    }
    state
        .user_service
        .set_refresh_token(payload.user_id, None)
        .await?;

    Ok(Json(Acknowledgement {
        success: true,
        message: Some("Google Calendar disconnected".into()),
    }))
}
