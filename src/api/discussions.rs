//! Discussion forum API endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{success, ApiJson, ApiResult};
use crate::errors::AppError;
use crate::models::{
    now_timestamp, parse_id, require_field, CreateDiscussionRequest, DeletedMessage, Discussion,
    EditDiscussionRequest, Reply,
};
use crate::AppState;

/// GET /discussions - List all posts, newest first.
pub async fn list_discussions(State(state): State<AppState>) -> ApiResult<Vec<Discussion>> {
    success(state.repo.list_discussions().await?)
}

/// POST /discussions - Create a new post.
pub async fn create_discussion(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateDiscussionRequest>,
) -> Result<(StatusCode, Json<Discussion>), AppError> {
    let content = require_field(request.content.as_deref(), "content")?;
    let author = require_field(request.author.as_deref(), "author")?;
    let author_id = require_field(request.author_id.as_deref(), "authorId")?;

    let post = state
        .repo
        .create_discussion(content, author, author_id)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// PUT /discussions/vote/:id - Add one vote to a post.
pub async fn vote_discussion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Discussion> {
    let id = parse_id(&id)?;
    success(state.repo.vote_discussion(id).await?)
}

/// PUT /discussions/:id - Replace a post's content.
pub async fn edit_discussion(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<EditDiscussionRequest>,
) -> ApiResult<Discussion> {
    let id = parse_id(&id)?;
    let content = require_field(request.content.as_deref(), "content")?;

    success(state.repo.edit_discussion(id, content).await?)
}

/// DELETE /discussions/:id - Delete a post with all its replies.
pub async fn delete_discussion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DeletedMessage> {
    let id = parse_id(&id)?;
    state.repo.delete_discussion(id).await?;

    success(DeletedMessage {
        message: "Discussion deleted".to_string(),
    })
}

/// POST /discussions/reply/:postId - Append a reply to a post.
pub async fn add_reply(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    ApiJson(request): ApiJson<CreateDiscussionRequest>,
) -> Result<(StatusCode, Json<Discussion>), AppError> {
    let post_id = parse_id(&post_id)?;
    let reply = Reply {
        content: require_field(request.content.as_deref(), "content")?.to_string(),
        author: require_field(request.author.as_deref(), "author")?.to_string(),
        author_id: require_field(request.author_id.as_deref(), "authorId")?.to_string(),
        timestamp: now_timestamp(),
    };

    let post = state.repo.add_reply(post_id, &reply).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// DELETE /discussions/reply/:postId/:replyIndex - Remove one reply by position.
pub async fn delete_reply(
    State(state): State<AppState>,
    Path((post_id, reply_index)): Path<(String, String)>,
) -> ApiResult<Discussion> {
    let post_id = parse_id(&post_id)?;
    let index: i64 = reply_index.trim().parse().map_err(|_| {
        AppError::Validation(format!("Invalid reply index: {}", reply_index))
    })?;

    success(state.repo.delete_reply(post_id, index).await?)
}
