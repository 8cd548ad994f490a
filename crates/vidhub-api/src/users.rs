use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use vidhub_db::Database;
use vidhub_types::api::{UpdateAccountRequest, UpdateAvatarRequest, UpdateCoverImageRequest};
use vidhub_types::models::User;

use crate::error::{ApiError, required};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::response::{empty, ok};
use crate::state::{AppState, run_blocking};

pub async fn current_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(&state, move |s| load_user(&s.db, user.id)).await?;
    Ok(ok(user, "Current user fetched successfully"))
}

pub async fn update_account(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fullname = required(&req.fullname, "fullname")?.to_string();
    let email = required(&req.email, "email")?.to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::InvalidArgument("email is invalid".into()));
    }

    let updated = run_blocking(&state, move |s| {
        s.db.update_account(user.id, &fullname, &email)?;
        load_user(&s.db, user.id)
    })
    .await?;

    info!(user_id = %updated.id, "Account details updated");
    Ok(ok(updated, "Account details updated successfully"))
}

pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdateAvatarRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let avatar = required(&req.avatar, "avatar")?.to_string();

    let updated = run_blocking(&state, move |s| {
        s.db.update_avatar(user.id, &avatar)?;
        load_user(&s.db, user.id)
    })
    .await?;

    Ok(ok(updated, "Avatar updated successfully"))
}

pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<UpdateCoverImageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cover_image = required(&req.cover_image, "coverImage")?.to_string();

    let updated = run_blocking(&state, move |s| {
        s.db.update_cover_image(user.id, &cover_image)?;
        load_user(&s.db, user.id)
    })
    .await?;

    Ok(ok(updated, "Cover image updated successfully"))
}

pub async fn channel_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = run_blocking(&state, move |s| s.views().channel_profile(&username, user.id)).await?;
    Ok(ok(profile, "User channel fetched successfully"))
}

pub async fn watch_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let history = run_blocking(&state, move |s| s.views().watch_history(user.id)).await?;
    Ok(ok(history, "Watch history fetched successfully"))
}

pub async fn clear_watch_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let cleared = run_blocking(&state, move |s| Ok(s.db.clear_watch_history(user.id)?)).await?;
    info!(user_id = %user.id, cleared, "Watch history cleared");
    Ok(ok(empty(), "Watch history cleared successfully"))
}

fn load_user(db: &Database, id: Uuid) -> Result<User, ApiError> {
    db.get_user_by_id(id)?
        .map(User::from)
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}
