use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use vidhub_db::Database;
use vidhub_types::api::PlaylistRequest;
use vidhub_types::models::Playlist;

use crate::error::{ApiError, parse_id, required};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::response::{created, empty, ok};
use crate::state::{AppState, run_blocking};

pub async fn create_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<PlaylistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = required(&req.name, "name")?.to_string();
    let description = req.description.trim().to_string();

    let playlist = run_blocking(&state, move |s| Ok(s.db.insert_playlist(user.id, &name, &description)?)).await?;

    info!(playlist_id = %playlist.id, "Playlist created");
    Ok(created(playlist, "Playlist created successfully"))
}

pub async fn get_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist_id = parse_id(&playlist_id, "playlistId")?;
    let playlist = run_blocking(&state, move |s| s.views().playlist_detail(playlist_id)).await?;
    Ok(ok(playlist, "Playlist fetched successfully"))
}

pub async fn user_playlists(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_id(&user_id, "userId")?;
    let playlists = run_blocking(&state, move |s| s.views().user_playlists(user_id)).await?;
    Ok(ok(playlists, "User playlists fetched successfully"))
}

pub async fn update_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
    JsonBody(req): JsonBody<PlaylistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist_id = parse_id(&playlist_id, "playlistId")?;
    let name = required(&req.name, "name")?.to_string();
    let description = req.description.trim().to_string();

    let playlist = run_blocking(&state, move |s| {
        owned_playlist(&s.db, playlist_id, user.id)?;
        s.db.update_playlist(playlist_id, &name, &description)?;
        owned_playlist(&s.db, playlist_id, user.id)
    })
    .await?;

    Ok(ok(playlist, "Playlist updated successfully"))
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(playlist_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist_id = parse_id(&playlist_id, "playlistId")?;

    run_blocking(&state, move |s| {
        owned_playlist(&s.db, playlist_id, user.id)?;
        s.db.delete_playlist(playlist_id)?;
        Ok(())
    })
    .await?;

    Ok(ok(empty(), "Playlist deleted successfully"))
}

pub async fn add_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;
    let playlist_id = parse_id(&playlist_id, "playlistId")?;

    let playlist = run_blocking(&state, move |s| {
        owned_playlist(&s.db, playlist_id, user.id)?;
        if !s.db.video_exists(video_id)? {
            return Err(ApiError::NotFound("Video not found".into()));
        }
        if !s.db.add_video_to_playlist(playlist_id, video_id)? {
            return Err(ApiError::Conflict("Video is already in the playlist".into()));
        }
        owned_playlist(&s.db, playlist_id, user.id)
    })
    .await?;

    Ok(ok(playlist, "Video added to playlist"))
}

pub async fn remove_video(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path((video_id, playlist_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let video_id = parse_id(&video_id, "videoId")?;
    let playlist_id = parse_id(&playlist_id, "playlistId")?;

    let playlist = run_blocking(&state, move |s| {
        owned_playlist(&s.db, playlist_id, user.id)?;
        if !s.db.remove_video_from_playlist(playlist_id, video_id)? {
            return Err(ApiError::NotFound("Video is not in the playlist".into()));
        }
        owned_playlist(&s.db, playlist_id, user.id)
    })
    .await?;

    Ok(ok(playlist, "Video removed from playlist"))
}

fn owned_playlist(db: &Database, playlist_id: Uuid, user: Uuid) -> Result<Playlist, ApiError> {
    let playlist = db
        .get_playlist(playlist_id)?
        .ok_or_else(|| ApiError::NotFound("Playlist not found".into()))?;
    if playlist.owner != user {
        return Err(ApiError::Forbidden("Only the owner can change this playlist".into()));
    }
    Ok(playlist)
}
