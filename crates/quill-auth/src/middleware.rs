//! Session middleware for Axum

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::cookie::CookieSettings;
use crate::error::AuthError;
use crate::jwt::JwtManager;

/// Authenticated user information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: i64,
}

/// State for the session middleware
#[derive(Clone)]
pub struct SessionGate {
    pub jwt: Arc<JwtManager>,
    pub cookie: CookieSettings,
}

impl SessionGate {
    pub fn new(jwt: Arc<JwtManager>, cookie: CookieSettings) -> Self {
        Self { jwt, cookie }
    }
}

/// Session middleware
///
/// Reads the session token from its cookie, verifies it, and adds the
/// `AuthUser` to request extensions. Any failure ends the request with 401.
pub async fn session_middleware(
    State(gate): State<SessionGate>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = jar
        .get(&gate.cookie.name)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AuthError::MissingToken)?;

    let user_id = gate.jwt.verify(&token)?;

    debug!("Authenticated user: {}", user_id);

    request.extensions_mut().insert(AuthUser { id: user_id });

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or(AuthError::MissingToken)
    }
}
