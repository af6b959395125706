//! Sign-in, sign-out and session introspection

use axum::{extract::State, http::HeaderMap, routing::{get, post}, Json, Router};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::auth::{clear_session_cookie, session_cookie, Caller};
use crate::error::{AppError, Result};
use crate::identity::Assertion;
use crate::models::User;
use crate::routes::JsonBody;
use crate::state::AppState;

pub const IDENTITY_SECRET_HEADER: &str = "x-identity-secret";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/signout", post(sign_out))
        .route("/api/session", get(current_session))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: User,
    pub expires_at: String,
}

fn secrets_match(presented: &[u8], expected: &[u8]) -> bool {
    presented.len() == expected.len()
        && presented
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// POST /api/auth/signin - Accept an identity assertion from the trusted
/// identity front and start a session
async fn sign_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    cookies: Cookies,
    body: Result<JsonBody<Assertion>>,
) -> Result<Json<SessionResponse>> {
    let presented = headers
        .get(IDENTITY_SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if !secrets_match(presented, state.identity_secret.as_bytes()) {
        log::warn!("sign-in rejected: bad identity secret");
        return Err(AppError::Unauthorized);
    }
    let JsonBody(assertion) = body?;

    let user = state.db.reconcile_identity(&assertion).await?;

    let (token, expires_at) = state.sessions.create_session(user.id).await;
    cookies.add(session_cookie(
        token,
        state.sessions.ttl(),
        state.secure_cookies,
    ));

    log::info!("signed in: user={}", user.id);
    Ok(Json(SessionResponse {
        user,
        expires_at: expires_at.to_rfc3339(),
    }))
}

/// POST /api/auth/signout - End the caller's session
async fn sign_out(
    State(state): State<AppState>,
    caller: Caller,
    cookies: Cookies,
) -> Result<Json<serde_json::Value>> {
    state.sessions.destroy_session(&caller.token).await;
    clear_session_cookie(&cookies);

    log::info!("signed out: user={}", caller.user_id);
    Ok(Json(serde_json::json!({ "success": true })))
}

/// GET /api/session - Who the caller is and when the session ends
async fn current_session(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<SessionResponse>> {
    // Users are never deleted, so a live session always has one.
    let user = state
        .db
        .find_user(caller.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(SessionResponse {
        user,
        expires_at: caller.expires_at.to_rfc3339(),
    }))
}
