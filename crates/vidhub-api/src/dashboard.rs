use axum::{Extension, extract::State, response::IntoResponse};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::response::ok;
use crate::state::{AppState, run_blocking};

pub async fn channel_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = run_blocking(&state, move |s| s.views().channel_stats(user.id)).await?;
    Ok(ok(stats, "Channel stats fetched successfully"))
}

pub async fn channel_videos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let videos = run_blocking(&state, move |s| s.views().channel_videos(user.id)).await?;
    Ok(ok(videos, "Channel videos fetched successfully"))
}
