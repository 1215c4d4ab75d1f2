//! Blog post routes
//!
//! Listing and reading posts is public. Creating, editing and deleting
//! posts requires a session, and edits are limited to the post's author.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use quill_auth::{AuthUser, session_middleware};
use quill_db::{NewPost, Post, UpdatePost};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

use super::{json_body, path_id};
use super::types::{
    CreatePostRequest, DataResponse, MessageResponse, PostCreatedResponse, UpdatePostRequest,
};

const POST_NOT_FOUND: &str = "Post not found";

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }
    Ok(())
}

/// Load a post and check that `user` wrote it
async fn owned_post(state: &AppState, id: i64, user: AuthUser) -> Result<Post, ApiError> {
    let post = state
        .db
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(POST_NOT_FOUND.to_string()))?;

    if post.user_id != user.id {
        debug!("User {} denied access to post {}", user.id, id);
        return Err(ApiError::Forbidden(
            "You can only modify your own posts".to_string(),
        ));
    }

    Ok(post)
}

// ==================== Public ====================

async fn list_posts(State(state): State<AppState>) -> Result<Json<DataResponse<Vec<Post>>>, ApiError> {
    let posts = state.db.list_posts().await?;
    Ok(Json(DataResponse { data: posts }))
}

async fn get_post(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<DataResponse<Post>>, ApiError> {
    let id = path_id(id)?;
    let post = state
        .db
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(POST_NOT_FOUND.to_string()))?;

    Ok(Json(DataResponse { data: post }))
}

// ==================== Protected ====================

async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<Json<PostCreatedResponse>, ApiError> {
    let request = json_body(payload)?;
    validate_title(&request.title)?;

    let post = state
        .db
        .insert_post(NewPost {
            title: request.title,
            description: request.description,
            image: request.image,
            user_id: user.id,
        })
        .await?;

    info!("User {} created post {}", user.id, post.id);

    Ok(Json(PostCreatedResponse {
        message: "Blog Post Created Successfully!".to_string(),
        post,
    }))
}

async fn update_post(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<Json<Post>, ApiError> {
    let id = path_id(id)?;
    let request = json_body(payload)?;
    if let Some(title) = &request.title {
        validate_title(title)?;
    }

    owned_post(&state, id, user).await?;

    let update = UpdatePost {
        title: request.title,
        description: request.description,
        image: request.image,
    };
    if !update.is_empty() && !state.db.update_post(id, update).await? {
        return Err(ApiError::NotFound(POST_NOT_FOUND.to_string()));
    }

    let post = state
        .db
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(POST_NOT_FOUND.to_string()))?;

    info!("User {} updated post {}", user.id, id);
    Ok(Json(post))
}

async fn my_posts(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Post>>, ApiError> {
    let posts = state.db.list_posts_by_user(user.id).await?;
    Ok(Json(posts))
}

async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = path_id(id)?;
    owned_post(&state, id, user).await?;

    if !state.db.delete_post(id).await? {
        return Err(ApiError::NotFound(POST_NOT_FOUND.to_string()));
    }

    info!("User {} deleted post {}", user.id, id);
    Ok(Json(MessageResponse::new("Post deleted successfully")))
}

/// Create post routes
///
/// Protected routes sit behind the session middleware; the public ones do not.
pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/allpost", get(list_posts))
        .route("/api/allpost/{id}", get(get_post));

    let protected = Router::new()
        .route("/api/post", post(create_post))
        .route("/api/updatepost/{id}", put(update_post))
        .route("/api/uniquepost", get(my_posts))
        .route("/api/deletepost/{id}", delete(delete_post))
        .route_layer(from_fn_with_state(
            state.session.clone(),
            session_middleware,
        ));

    public.merge(protected)
}
