use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;

use vidhub_db::models::ToggleTarget;
use vidhub_types::api::LikeToggleResponse;

use crate::error::{ApiError, parse_id};
use crate::middleware::AuthUser;
use crate::response::ok;
use crate::state::{AppState, run_blocking};

pub async fn toggle_video_like(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = ToggleTarget::Video(parse_id(&video_id, "videoId")?);
    toggle_like(state, user, target).await
}

pub async fn toggle_comment_like(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = ToggleTarget::Comment(parse_id(&comment_id, "commentId")?);
    toggle_like(state, user, target).await
}

pub async fn toggle_tweet_like(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tweet_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let target = ToggleTarget::Tweet(parse_id(&tweet_id, "tweetId")?);
    toggle_like(state, user, target).await
}

pub async fn liked_videos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let liked = run_blocking(&state, move |s| s.views().liked_videos(user.id)).await?;
    Ok(ok(liked, "Liked videos fetched successfully"))
}

async fn toggle_like(
    state: AppState,
    user: AuthUser,
    target: ToggleTarget,
) -> Result<impl IntoResponse, ApiError> {
    if let ToggleTarget::Channel(_) = target {
        return Err(ApiError::InvalidArgument("Channels are subscribed to, not liked".into()));
    }

    let outcome = run_blocking(&state, move |s| {
        s.db.toggle(target, user.id)?
            .ok_or_else(|| ApiError::NotFound("Like target not found".into()))
    })
    .await?;

    debug!(user_id = %user.id, ?target, ?outcome, "Like toggled");
    let is_liked = outcome.is_active();
    let message = if is_liked { "Liked" } else { "Like removed" };
    Ok(ok(LikeToggleResponse { is_liked }, message))
}
