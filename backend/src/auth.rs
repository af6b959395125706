use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Duration, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tower_cookies::{
    cookie::{time, SameSite},
    Cookie, Cookies,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "planbook_session";

#[derive(Debug, Clone)]
struct Session {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// Server-side session table: opaque token -> durable user id.
///
/// Each session has a fixed lifetime measured from sign-in. Lookups never
/// extend it.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn create_session(&self, user_id: Uuid) -> (String, DateTime<Utc>) {
        self.create_session_at(user_id, Utc::now()).await
    }

    async fn create_session_at(&self, user_id: Uuid, now: DateTime<Utc>) -> (String, DateTime<Utc>) {
        let token = Uuid::new_v4().to_string();
        let expires_at = now + self.ttl;

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(token.clone(), Session { user_id, expires_at });
        (token, expires_at)
    }

    /// Returns the user id and expiry behind `token` if it is still valid.
    pub async fn resolve(&self, token: &str) -> Option<(Uuid, DateTime<Utc>)> {
        self.resolve_at(token, Utc::now()).await
    }

    async fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Option<(Uuid, DateTime<Utc>)> {
        let session = self.sessions.read().await.get(token).cloned()?;
        if session.expires_at > now {
            return Some((session.user_id, session.expires_at));
        }
        self.sessions.write().await.remove(token);
        None
    }

    pub async fn destroy_session(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

pub fn session_cookie(token: String, ttl: Duration, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie.set_max_age(time::Duration::seconds(ttl.num_seconds()));
    cookie
}

pub fn clear_session_cookie(cookies: &Cookies) {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    cookies.remove(cookie);
}

/// The authenticated caller of a request.
///
/// Extracting a `Caller` is the first step of every protected handler: the
/// user id always comes from the server-side session, never from the request
/// body or path.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(msg.to_string()))?;

        let token = cookies
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .ok_or(AppError::Unauthorized)?;

        let (user_id, expires_at) = state
            .sessions
            .resolve(&token)
            .await
            .ok_or(AppError::Unauthorized)?;

        Ok(Caller {
            user_id,
            token,
            expires_at,
        })
    }
}
