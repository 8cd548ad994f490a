use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use vidhub_db::Database;
use vidhub_db::models::{NewVideo, SortDirection, VideoChanges, VideoFilter, VideoSort, VideoSortField};
use vidhub_types::api::{PublishToggleResponse, PublishVideoRequest, UpdateVideoRequest, VideoFeedQuery};
use vidhub_types::models::Video;
use vidhub_types::pagination::PageRequest;

use crate::error::{ApiError, parse_id, required};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::response::{created, empty, ok};
use crate::state::{AppState, run_blocking};

pub async fn list_videos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<VideoFeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref());
    let sort = feed_sort(query.sort_by.as_deref(), query.sort_type.as_deref())?;

    let owner = match query.user_id.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(raw) => Some(parse_id(raw, "userId")?),
        None => None,
    };
    let filter = VideoFilter {
        query: query.query.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
        owner,
        // drafts show up only when a creator browses their own channel
        viewer: owner.filter(|o| *o == user.id),
    };

    let feed = run_blocking(&state, move |s| s.views().video_feed(&filter, sort, page)).await?;
    Ok(ok(feed, "Videos fetched successfully"))
}

pub async fn publish_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<PublishVideoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = required(&req.title, "title")?.to_string();
    let description = required(&req.description, "description")?.to_string();
    let video_file = required(&req.video_file, "videoFile")?.to_string();
    let thumbnail = required(&req.thumbnail, "thumbnail")?.to_string();
    if !req.duration.is_finite() || req.duration < 0.0 {
        return Err(ApiError::InvalidArgument("duration must be a non-negative number".into()));
    }
    let duration = req.duration;

    let video = run_blocking(&state, move |s| {
        Ok(s.db.insert_video(&NewVideo {
            owner: user.id,
            title: &title,
            description: &description,
            video_file: &video_file,
            thumbnail: &thumbnail,
            duration,
        })?)
    })
    .await?;

    info!(video_id = %video.id, owner = %video.owner, "Video published");
    Ok(created(video, "Video published successfully"))
}

/// Fetching a video counts as watching it: the view counter goes up and the
/// video moves to the front of the viewer's history.
pub async fn get_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;

    let detail = run_blocking(&state, move |s| {
        let mut detail = s.views().video_detail(video_id, user.id)?;
        if s.db.increment_views(video_id)? {
            detail.video.views += 1;
        }
        s.db.record_watch(user.id, video_id)?;
        Ok(detail)
    })
    .await?;

    Ok(ok(detail, "Video fetched successfully"))
}

pub async fn update_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
    JsonBody(req): JsonBody<UpdateVideoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;
    let trimmed = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    let title = trimmed(&req.title);
    let description = trimmed(&req.description);
    let thumbnail = trimmed(&req.thumbnail);
    if title.is_none() && description.is_none() && thumbnail.is_none() {
        return Err(ApiError::InvalidArgument("Nothing to update".into()));
    }

    let video = run_blocking(&state, move |s| {
        owned_video(&s.db, video_id, user.id, "update")?;
        s.db.update_video(
            video_id,
            &VideoChanges {
                title: title.as_deref(),
                description: description.as_deref(),
                thumbnail: thumbnail.as_deref(),
            },
        )?;
        owned_video(&s.db, video_id, user.id, "update")
    })
    .await?;

    Ok(ok(video, "Video updated successfully"))
}

pub async fn delete_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;

    run_blocking(&state, move |s| {
        owned_video(&s.db, video_id, user.id, "delete")?;
        s.db.delete_video(video_id)?;
        Ok(())
    })
    .await?;

    info!(video_id = %video_id, "Video deleted");
    Ok(ok(empty(), "Video deleted successfully"))
}

pub async fn toggle_publish(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;

    let is_published = run_blocking(&state, move |s| {
        owned_video(&s.db, video_id, user.id, "publish")?;
        s.db.toggle_published(video_id)?
            .ok_or_else(|| ApiError::NotFound("Video not found".into()))
    })
    .await?;

    Ok(ok(PublishToggleResponse { is_published }, "Publish status toggled"))
}

fn feed_sort(sort_by: Option<&str>, sort_type: Option<&str>) -> Result<VideoSort, ApiError> {
    let mut sort = VideoSort::default();
    if let Some(raw) = sort_by.map(str::trim).filter(|s| !s.is_empty()) {
        sort.field = VideoSortField::parse(raw)
            .ok_or_else(|| ApiError::InvalidArgument(format!("Cannot sort by {}", raw)))?;
    }
    if let Some(raw) = sort_type.map(str::trim).filter(|s| !s.is_empty()) {
        sort.direction = SortDirection::parse(raw)
            .ok_or_else(|| ApiError::InvalidArgument("sortType must be asc or desc".into()))?;
    }
    Ok(sort)
}

pub(crate) fn owned_video(db: &Database, video_id: Uuid, user: Uuid, action: &str) -> Result<Video, ApiError> {
    let video = db
        .get_video(video_id)?
        .ok_or_else(|| ApiError::NotFound("Video not found".into()))?;
    if video.owner != user {
        return Err(ApiError::Forbidden(format!("Only the owner can {} this video", action)));
    }
    Ok(video)
}
