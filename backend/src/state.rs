use std::sync::Arc;

use crate::auth::SessionStore;
use crate::db::Db;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub sessions: SessionStore,
    /// Shared secret the identity front presents on sign-in.
    pub identity_secret: Arc<str>,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(db: Db, sessions: SessionStore, identity_secret: impl Into<Arc<str>>) -> Self {
        Self {
            db,
            sessions,
            identity_secret: identity_secret.into(),
            secure_cookies: false,
        }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }
}
