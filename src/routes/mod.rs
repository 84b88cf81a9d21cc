pub mod auth;
pub mod calendar;
pub mod candidates;
pub mod data;
pub mod google;
pub mod health;
pub mod jobs;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{
    auth::require_bearer_auth,
    cors::frontend_cors,
    rate_limit::{rate_limit_middleware, RateLimiter},
};
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/signup", post(auth::sign_up))
        .route("/api/auth/login", post(auth::login))
        .route("/api/google/auth/callback", get(google::oauth_callback));

    let session_api = Router::new()
        .route("/api/users/:id", get(users::get_user))
        .route("/api/data/all/:user_id", get(data::get_all_data))
        .route("/api/jobs", post(jobs::create_job))
        .route(
            "/api/jobs/:id",
            patch(jobs::update_job).delete(jobs::delete_job),
        )
        .route(
            "/api/candidates/:id/status",
            patch(candidates::update_status),
        )
        .route("/api/google/auth/connect", get(google::connect))
        .route("/api/google/auth/disconnect", post(google::disconnect))
        .route(
            "/api/google/calendar/list-calendars",
            get(calendar::list_calendars),
        )
        .route(
            "/api/google/calendar/create-event",
            post(calendar::create_event),
        )
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    let cors = frontend_cors(&state.config.frontend_url);
    let limiter = RateLimiter::per_second(state.config.api_rps);

    public_api
        .merge(session_api)
        .layer(from_fn_with_state(limiter, rate_limit_middleware))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024))
}
