pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod likes;
pub mod middleware;
pub mod playlists;
pub mod response;
pub mod session;
pub mod state;
pub mod subscriptions;
pub mod tweets;
pub mod users;
pub mod videos;
pub mod views;

use axum::{
    Router,
    middleware as axum_middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};

use crate::middleware::require_auth;
use crate::response::ok;
use crate::state::AppState;

pub use crate::error::ApiError;
pub use crate::session::SessionPolicy;
pub use crate::state::AppStateInner;

/// Every route of the service, mounted under `/api/v1`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
        .route("/users/refresh-token", post(auth::refresh_token));

    let protected_routes = Router::new()
        // Account
        .route("/users/logout", post(auth::logout))
        .route("/users/change-password", post(auth::change_password))
        .route("/users/current-user", get(users::current_user))
        .route("/users/update-account", patch(users::update_account))
        .route("/users/avatar", patch(users::update_avatar))
        .route("/users/cover-image", patch(users::update_cover_image))
        .route("/users/c/{username}", get(users::channel_profile))
        .route("/users/history", get(users::watch_history).delete(users::clear_watch_history))
        // Videos
        .route("/videos", get(videos::list_videos).post(videos::publish_video))
        .route(
            "/videos/{video_id}",
            get(videos::get_video)
                .patch(videos::update_video)
                .delete(videos::delete_video),
        )
        .route("/videos/toggle/publish/{video_id}", patch(videos::toggle_publish))
        // Comments
        .route("/comments/{video_id}", get(comments::list_comments).post(comments::add_comment))
        .route(
            "/comments/c/{comment_id}",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        // Likes
        .route("/likes/toggle/v/{video_id}", post(likes::toggle_video_like))
        .route("/likes/toggle/c/{comment_id}", post(likes::toggle_comment_like))
        .route("/likes/toggle/t/{tweet_id}", post(likes::toggle_tweet_like))
        .route("/likes/videos", get(likes::liked_videos))
        // Subscriptions
        .route(
            "/subscriptions/c/{channel_id}",
            get(subscriptions::channel_subscribers).post(subscriptions::toggle_subscription),
        )
        .route("/subscriptions/u/{subscriber_id}", get(subscriptions::subscribed_channels))
        // Playlists
        .route("/playlist", post(playlists::create_playlist))
        .route(
            "/playlist/{playlist_id}",
            get(playlists::get_playlist)
                .patch(playlists::update_playlist)
                .delete(playlists::delete_playlist),
        )
        .route("/playlist/add/{video_id}/{playlist_id}", patch(playlists::add_video))
        .route("/playlist/remove/{video_id}/{playlist_id}", patch(playlists::remove_video))
        .route("/playlist/user/{user_id}", get(playlists::user_playlists))
        // Tweets
        .route("/tweets", post(tweets::create_tweet))
        .route("/tweets/user/{user_id}", get(tweets::user_tweets))
        .route("/tweets/{tweet_id}", patch(tweets::update_tweet).delete(tweets::delete_tweet))
        // Dashboard
        .route("/dashboard/stats", get(dashboard::channel_stats))
        .route("/dashboard/videos", get(dashboard::channel_videos))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api/v1", public_routes.merge(protected_routes))
        .with_state(state)
}

async fn healthcheck() -> impl IntoResponse {
    ok(serde_json::json!({ "status": "ok" }), "OK")
}
