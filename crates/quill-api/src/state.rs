//! Application state

use quill_auth::{AuthService, CookieSettings, SessionGate};
use quill_db::Database;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: AuthService,
    pub session: SessionGate,
}

impl AppState {
    pub fn new(db: Database, auth: AuthService, session: SessionGate) -> Self {
        Self { db, auth, session }
    }

    /// Session cookie settings
    pub fn cookie(&self) -> &CookieSettings {
        &self.session.cookie
    }
}
