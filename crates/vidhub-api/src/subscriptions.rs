use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::debug;

use vidhub_db::models::ToggleTarget;
use vidhub_types::api::SubscriptionToggleResponse;

use crate::error::{ApiError, parse_id};
use crate::middleware::AuthUser;
use crate::response::ok;
use crate::state::{AppState, run_blocking};

pub async fn toggle_subscription(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(channel_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let channel_id = parse_id(&channel_id, "channelId")?;
    if channel_id == user.id {
        return Err(ApiError::InvalidArgument("You cannot subscribe to your own channel".into()));
    }

    let outcome = run_blocking(&state, move |s| {
        s.db.toggle(ToggleTarget::Channel(channel_id), user.id)?
            .ok_or_else(|| ApiError::NotFound("Channel does not exist".into()))
    })
    .await?;

    debug!(user_id = %user.id, channel_id = %channel_id, ?outcome, "Subscription toggled");
    let is_subscribed = outcome.is_active();
    let message = if is_subscribed { "Subscribed" } else { "Unsubscribed" };
    Ok(ok(SubscriptionToggleResponse { is_subscribed }, message))
}

pub async fn channel_subscribers(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let channel_id = parse_id(&channel_id, "channelId")?;
    let subscribers = run_blocking(&state, move |s| s.views().channel_subscribers(channel_id)).await?;
    Ok(ok(subscribers, "Subscribers fetched successfully"))
}

pub async fn subscribed_channels(
    State(state): State<AppState>,
    Path(subscriber_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let subscriber_id = parse_id(&subscriber_id, "subscriberId")?;
    let channels = run_blocking(&state, move |s| s.views().subscribed_channels(subscriber_id)).await?;
    Ok(ok(channels, "Subscribed channels fetched successfully"))
}
