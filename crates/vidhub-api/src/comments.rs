use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

use vidhub_db::Database;
use vidhub_types::api::CommentRequest;
use vidhub_types::models::Comment;
use vidhub_types::pagination::PageQuery;

use crate::error::{ApiError, parse_id, required};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::response::{created, empty, ok};
use crate::state::{AppState, run_blocking};

pub async fn list_comments(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;
    let page = page.to_request();

    let comments = run_blocking(&state, move |s| s.views().video_comments(video_id, page)).await?;
    Ok(ok(comments, "Comments fetched successfully"))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
    JsonBody(req): JsonBody<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;
    let content = required(&req.content, "content")?.to_string();

    let comment = run_blocking(&state, move |s| {
        if !s.db.video_exists(video_id)? {
            return Err(ApiError::NotFound("Video not found".into()));
        }
        Ok(s.db.insert_comment(video_id, user.id, &content)?)
    })
    .await?;

    Ok(created(comment, "Comment added successfully"))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<String>,
    JsonBody(req): JsonBody<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment_id = parse_id(&comment_id, "commentId")?;
    let content = required(&req.content, "content")?.to_string();

    let comment = run_blocking(&state, move |s| {
        owned_comment(&s.db, comment_id, user.id)?;
        s.db.update_comment(comment_id, &content)?;
        owned_comment(&s.db, comment_id, user.id)
    })
    .await?;

    Ok(ok(comment, "Comment updated successfully"))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let comment_id = parse_id(&comment_id, "commentId")?;

    run_blocking(&state, move |s| {
        owned_comment(&s.db, comment_id, user.id)?;
        s.db.delete_comment(comment_id)?;
        Ok(())
    })
    .await?;

    Ok(ok(empty(), "Comment deleted successfully"))
}

fn owned_comment(db: &Database, comment_id: Uuid, user: Uuid) -> Result<Comment, ApiError> {
    let comment = db
        .get_comment(comment_id)?
        .ok_or_else(|| ApiError::NotFound("Comment not found".into()))?;
    if comment.owner != user {
        return Err(ApiError::Forbidden("Only the author can change this comment".into()));
    }
    Ok(comment)
}
