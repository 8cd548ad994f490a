use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use vidhub_db::Database;
use vidhub_types::api::TweetRequest;
use vidhub_types::models::Tweet;

use crate::error::{ApiError, parse_id, required};
use crate::extract::JsonBody;
use crate::middleware::AuthUser;
use crate::response::{created, empty, ok};
use crate::state::{AppState, run_blocking};

pub async fn create_tweet(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<TweetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = required(&req.content, "content")?.to_string();
    let tweet = run_blocking(&state, move |s| Ok(s.db.insert_tweet(user.id, &content)?)).await?;
    Ok(created(tweet, "Tweet created successfully"))
}

pub async fn user_tweets(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = parse_id(&user_id, "userId")?;
    let tweets = run_blocking(&state, move |s| s.views().user_tweets(user_id)).await?;
    Ok(ok(tweets, "Tweets fetched successfully"))
}

pub async fn update_tweet(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tweet_id): Path<String>,
    JsonBody(req): JsonBody<TweetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tweet_id = parse_id(&tweet_id, "tweetId")?;
    let content = required(&req.content, "content")?.to_string();

    let tweet = run_blocking(&state, move |s| {
        owned_tweet(&s.db, tweet_id, user.id)?;
        s.db.update_tweet(tweet_id, &content)?;
        owned_tweet(&s.db, tweet_id, user.id)
    })
    .await?;

    Ok(ok(tweet, "Tweet updated successfully"))
}

pub async fn delete_tweet(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tweet_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tweet_id = parse_id(&tweet_id, "tweetId")?;

    run_blocking(&state, move |s| {
        owned_tweet(&s.db, tweet_id, user.id)?;
        s.db.delete_tweet(tweet_id)?;
        Ok(())
    })
    .await?;

    Ok(ok(empty(), "Tweet deleted successfully"))
}

fn owned_tweet(db: &Database, tweet_id: Uuid, user: Uuid) -> Result<Tweet, ApiError> {
    let tweet = db
        .get_tweet(tweet_id)?
        .ok_or_else(|| ApiError::NotFound("Tweet not found".into()))?;
    if tweet.owner != user {
        return Err(ApiError::Forbidden("Only the author can change this tweet".into()));
    }
    Ok(tweet)
}
