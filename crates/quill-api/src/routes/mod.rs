//! API routes

mod auth;
mod health;
mod posts;
pub mod types;

use axum::{
    Json, Router,
    extract::{
        Path,
        rejection::{JsonRejection, PathRejection},
    },
};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Unwrap a JSON body, turning any rejection into a 400 `{message}`
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            debug!("Rejected request body: {}", rejection.body_text());
            Err(ApiError::BadRequest("Invalid request body".to_string()))
        }
    }
}

/// Unwrap a numeric path id, turning any rejection into a 400 `{message}`
pub(crate) fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    match path {
        Ok(Path(id)) => Ok(id),
        Err(rejection) => {
            debug!("Rejected path: {}", rejection.body_text());
            Err(ApiError::BadRequest("Invalid id".to_string()))
        }
    }
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(posts::routes(&state))
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new().await;

        let response = app.get("/api/health", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json["status"], "ok");
        assert_eq!(response.json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_unauthenticated() {
        let app = TestApp::new().await;

        let response = app.get("/api/nothing-here", None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}
