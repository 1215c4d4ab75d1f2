//! Session cookie construction

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::OffsetDateTime;

use crate::jwt::IssuedToken;

/// Session cookie settings
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub secure: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: "jwt".to_string(),
            secure: true,
        }
    }
}

impl CookieSettings {
    /// HTTP-only cookie carrying the token, expiring with it
    pub fn session_cookie(&self, issued: &IssuedToken) -> Cookie<'static> {
        let expires = OffsetDateTime::from_unix_timestamp(issued.expires_at.timestamp())
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);

        Cookie::build((self.name.clone(), issued.token.clone()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .expires(expires)
            .build()
    }

    /// Cookie that makes the client drop the session
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }
}
