//! Registration, login and logout routes

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use axum_extra::extract::cookie::CookieJar;
use quill_auth::Registration;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

use super::json_body;
use super::types::{LoginRequest, MessageResponse, RegisterRequest, RegisterResponse};

/// Create a new account
async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let request = json_body(payload)?;

    let user = state
        .auth
        .register(Registration {
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
            email: request.email,
            password: request.password,
        })
        .await?;

    Ok(Json(RegisterResponse {
        user,
        message: "Registration successful".to_string(),
    }))
}

/// Authenticate and set the session cookie
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    let request = json_body(payload)?;

    let session = state.auth.login(&request.email, &request.password).await?;
    let cookie = state.cookie().session_cookie(&session.token);

    Ok((
        jar.add(cookie),
        Json(MessageResponse::new("Login successful")),
    ))
}

/// Clear the session cookie
///
/// Sessions are stateless: a token copied before logout stays valid until
/// it expires.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    info!("Session cookie cleared");
    (
        jar.add(state.cookie().removal_cookie()),
        Json(MessageResponse::new("Logout successful")),
    )
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::json;

    #[tokio::test]
    async fn test_register_returns_user_without_hash() {
        let app = TestApp::new().await;

        let response = app.post_json("/api/register", ada("a@b.com", "password1"), None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["message"], "Registration successful");
        assert_eq!(response.json["user"]["email"], "a@b.com");
        assert!(response.json["user"]["id"].as_i64().unwrap() > 0);
        assert!(response.json["user"].get("password_hash").is_none());
        assert!(!response.body.contains("argon2"));
    }

    #[tokio::test]
    async fn test_register_short_password() {
        let app = TestApp::new().await;

        let response = app.post_json("/api/register", ada("a@b.com", "abc"), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json["message"],
            "Password must be at least 7 characters long"
        );
    }

    #[tokio::test]
    async fn test_register_invalid_email() {
        let app = TestApp::new().await;

        let response = app.post_json("/api/register", ada("nope", "password1"), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["message"], "Invalid email format");
    }

    #[tokio::test]
    async fn test_register_duplicate_with_whitespace() {
        let app = TestApp::new().await;

        let first = app.post_json("/api/register", ada("a@b.com", "password1"), None).await;
        assert_eq!(first.status, StatusCode::OK);

        let second = app.post_json("/api/register", ada("  a@b.com  ", "password1"), None).await;
        assert_eq!(second.status, StatusCode::BAD_REQUEST);
        assert_eq!(second.json["message"], "Email already registered");
    }

    #[tokio::test]
    async fn test_register_malformed_body() {
        let app = TestApp::new().await;

        let response = app.post_raw("/api/register", "{not json").await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.json["message"].is_string());

        let missing = app.post_json("/api/register", json!({"email": "a@b.com"}), None).await;
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_outcomes() {
        let app = TestApp::new().await;
        app.post_json("/api/register", ada("a@b.com", "password1"), None).await;

        let unknown = app.post_json("/api/login", login("ghost@b.com", "password1"), None).await;
        assert_eq!(unknown.status, StatusCode::NOT_FOUND);
        assert_eq!(unknown.json["message"], "User not found");

        let wrong = app.post_json("/api/login", login("a@b.com", "password2"), None).await;
        assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
        assert_eq!(wrong.json["message"], "Incorrect password");
        assert!(wrong.set_cookie.is_none());

        let ok = app.post_json("/api/login", login("a@b.com", "password1"), None).await;
        assert_eq!(ok.status, StatusCode::OK);
        assert_eq!(ok.json["message"], "Login successful");

        let set_cookie = ok.set_cookie.expect("session cookie");
        let cookie = axum_extra::extract::cookie::Cookie::parse(set_cookie).unwrap();
        assert_eq!(cookie.name(), "jwt");
        assert_eq!(cookie.http_only(), Some(true));

        let expires = cookie.expires_datetime().unwrap().unix_timestamp();
        let expected = (Utc::now() + Duration::hours(24)).timestamp();
        assert!((expires - expected).abs() <= 5);
    }

    #[tokio::test]
    async fn test_login_throttled() {
        let app = TestApp::new().await;
        app.post_json("/api/register", ada("a@b.com", "password1"), None).await;

        for _ in 0..TEST_FREE_ATTEMPTS + 1 {
            let wrong = app.post_json("/api/login", login("a@b.com", "bad-password"), None).await;
            assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
        }

        let locked = app.post_json("/api/login", login("a@b.com", "password1"), None).await;
        assert_eq!(locked.status, StatusCode::TOO_MANY_REQUESTS);
        assert!(locked.retry_after.is_some());
    }

    #[tokio::test]
    async fn test_logout_expires_cookie() {
        let app = TestApp::new().await;

        let response = app.post_json("/api/logout", json!({}), None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["message"], "Logout successful");

        let cookie = axum_extra::extract::cookie::Cookie::parse(response.set_cookie.unwrap()).unwrap();
        assert_eq!(cookie.name(), "jwt");
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age().map(|age| age.whole_seconds()), Some(0));
    }
}
