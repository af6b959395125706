pub mod auth;
pub mod events;
pub mod profiles;

use axum::{
    extract::{FromRequest, State},
    routing::get,
    Json, Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer};

use crate::error::{AppError, Result};
use crate::state::AppState;

pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// JSON request body. Wrong content types become 415, anything else that
/// fails to parse becomes 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

pub fn router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(profiles::router())
        .merge(events::router())
        .layer(CookieManagerLayer::new())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health - Database reachability
async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    state
        .db
        .ping()
        .await
        .map_err(|e| AppError::Internal(format!("health check failed: {e}")))?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
