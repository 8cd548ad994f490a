use axum::{
    Router,
    body::Body,
    http::{
        Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use vidhub_api::{AppStateInner, SessionPolicy, router};
use vidhub_auth::{TokenConfig, TokenService};
use vidhub_db::Database;

fn app() -> Router {
    let state = AppStateInner::new(
        Database::open_in_memory().expect("in-memory db"),
        TokenService::new(&TokenConfig::new("test-access-secret", "test-refresh-secret")),
        SessionPolicy::Single,
    );
    router(state)
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, json) = send_raw(app, method, uri, token.map(|t| (AUTHORIZATION, format!("Bearer {}", t))), body).await;
    (status, json)
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    header: Option<(axum::http::HeaderName, String)>,
    body: Option<Value>,
) -> (StatusCode, Vec<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((name, value)) = header {
        builder = builder.header(name, value);
    }
    let request = match body {
        Some(body) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");

    let response = app.clone().oneshot(request).await.expect("request should succeed");
    let status = response.status();
    let cookies = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();

    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response should be valid json")
    };
    (status, cookies, json)
}

async fn register_and_login(app: &Router, username: &str) -> (String, String, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/users/register",
        None,
        Some(json!({
            "fullname": username,
            "email": format!("{}@example.com", username),
            "username": username,
            "password": "correct horse",
            "avatar": "https://cdn.example.com/a.png"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let id = body["data"]["id"].as_str().expect("user id").to_string();

    let (status, body) = send(
        app,
        "POST",
        "/api/v1/users/login",
        None,
        Some(json!({ "username": username, "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let access = body["data"]["accessToken"].as_str().expect("access token").to_string();
    let refresh = body["data"]["refreshToken"].as_str().expect("refresh token").to_string();
    (id, access, refresh)
}

#[tokio::test]
async fn healthcheck_is_public() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/v1/healthcheck", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["statusCode"], 200);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/v1/users/current-user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());

    let (status, _) = send(&app, "GET", "/api/v1/users/current-user", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_sets_secure_cookies() {
    let app = app();
    send(
        &app,
        "POST",
        "/api/v1/users/register",
        None,
        Some(json!({
            "fullname": "Alice",
            "email": "alice@example.com",
            "username": "alice",
            "password": "correct horse",
            "avatar": "a.png"
        })),
    )
    .await;

    let (status, cookies, body) = send_raw(
        &app,
        "POST",
        "/api/v1/users/login",
        None,
        Some(json!({ "email": "ALICE@example.com", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["user"].get("password").is_none());

    for name in ["accessToken=", "refreshToken="] {
        let cookie = cookies.iter().find(|c| c.starts_with(name)).expect("token cookie");
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    // the access cookie alone authenticates
    let access_cookie = cookies
        .iter()
        .find(|c| c.starts_with("accessToken="))
        .and_then(|c| c.split(';').next())
        .expect("cookie pair")
        .to_string();
    let (status, _, body) = send_raw(&app, "GET", "/api/v1/users/current-user", Some((COOKIE, access_cookie)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
}

#[tokio::test]
async fn refresh_rotates_once() {
    let app = app();
    let (_, _, refresh) = register_and_login(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/refresh-token",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["data"]["refreshToken"].as_str().expect("new refresh token").to_string();
    assert_ne!(rotated, refresh);

    // the superseded token is refused
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/refresh-token",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    // the rotated one still works, via cookie this time
    let (status, _, _) = send_raw(
        &app,
        "POST",
        "/api/v1/users/refresh-token",
        Some((COOKIE, format!("refreshToken={}", rotated))),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let app = app();
    let (_, access, refresh) = register_and_login(&app, "alice").await;

    let (status, _) = send(&app, "POST", "/api/v1/users/logout", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/users/refresh-token",
        None,
        Some(json!({ "refreshToken": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app();
    register_and_login(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/register",
        None,
        Some(json!({
            "fullname": "Other Alice",
            "email": "other@example.com",
            "username": "alice",
            "password": "correct horse",
            "avatar": "a.png"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["statusCode"], 409);
}

#[tokio::test]
async fn unknown_fields_are_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/users/login",
        None,
        Some(json!({ "username": "alice", "password": "x", "isAdmin": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn like_toggle_and_liked_videos() {
    let app = app();
    let (_, access, _) = register_and_login(&app, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/videos",
        Some(&access),
        Some(json!({
            "title": "First upload",
            "description": "hello",
            "videoFile": "https://cdn.example.com/v.mp4",
            "thumbnail": "https://cdn.example.com/t.png",
            "duration": 42.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let video_id = body["data"]["id"].as_str().expect("video id").to_string();

    let uri = format!("/api/v1/likes/toggle/v/{}", video_id);
    let (status, body) = send(&app, "POST", &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isLiked"], true);

    let (_, body) = send(&app, "GET", "/api/v1/likes/videos", Some(&access), None).await;
    assert_eq!(body["data"][0]["id"], video_id.as_str());
    assert_eq!(body["data"][0]["title"], "First upload");

    let (_, body) = send(&app, "POST", &uri, Some(&access), None).await;
    assert_eq!(body["data"]["isLiked"], false);
    let (_, body) = send(&app, "GET", "/api/v1/likes/videos", Some(&access), None).await;
    assert_eq!(body["data"], json!([]));

    // liking something that does not exist
    let missing = format!("/api/v1/likes/toggle/v/{}", uuid::Uuid::new_v4());
    let (status, _) = send(&app, "POST", &missing, Some(&access), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "POST", "/api/v1/likes/toggle/v/not-an-id", Some(&access), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // a deleted video can no longer be liked
    let (status, _) = send(&app, "DELETE", &format!("/api/v1/videos/{}", video_id), Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = send(&app, "GET", "/api/v1/likes/videos", Some(&access), None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn subscriptions_and_channel_profile() {
    let app = app();
    let (chan_id, chan_access, _) = register_and_login(&app, "chan").await;
    let (_, alice_access, _) = register_and_login(&app, "alice").await;

    let uri = format!("/api/v1/subscriptions/c/{}", chan_id);
    let (status, body) = send(&app, "POST", &uri, Some(&alice_access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isSubscribed"], true);

    let (_, body) = send(&app, "GET", "/api/v1/users/c/chan", Some(&alice_access), None).await;
    assert_eq!(body["data"]["subscribersCount"], 1);
    assert_eq!(body["data"]["isSubscribed"], true);

    let (_, body) = send(&app, "GET", &uri, Some(&chan_access), None).await;
    assert_eq!(body["data"][0]["username"], "alice");

    let (status, _) = send(&app, "POST", &uri, Some(&chan_access), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn feed_pagination_and_history() {
    let app = app();
    let (user_id, access, _) = register_and_login(&app, "alice").await;

    let mut ids = Vec::new();
    for i in 0..12 {
        let (_, body) = send(
            &app,
            "POST",
            "/api/v1/videos",
            Some(&access),
            Some(json!({
                "title": format!("video {}", i),
                "description": "d",
                "videoFile": "v.mp4",
                "thumbnail": "t.png",
                "duration": 1.0
            })),
        )
        .await;
        ids.push(body["data"]["id"].as_str().expect("video id").to_string());
    }

    let uri = format!("/api/v1/videos?page=2&limit=5&sortBy=createdAt&sortType=asc&userId={}", user_id);
    let (status, body) = send(&app, "GET", &uri, Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["totalDocs"], 12);
    assert_eq!(body["data"]["totalPages"], 3);
    assert_eq!(body["data"]["docs"][0]["title"], "video 5");
    assert_eq!(body["data"]["docs"][0]["owner"]["username"], "alice");
    assert_eq!(body["data"]["hasNextPage"], true);

    let (status, _) = send(&app, "GET", "/api/v1/videos?sortBy=password", Some(&access), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for id in [&ids[3], &ids[1], &ids[3]] {
        let (status, _) = send(&app, "GET", &format!("/api/v1/videos/{}", id), Some(&access), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&app, "GET", "/api/v1/users/history", Some(&access), None).await;
    let history: Vec<&str> = body["data"]
        .as_array()
        .expect("history array")
        .iter()
        .filter_map(|v| v["id"].as_str())
        .collect();
    assert_eq!(history, vec![ids[3].as_str(), ids[1].as_str()]);

    let (_, body) = send(&app, "GET", "/api/v1/dashboard/stats", Some(&access), None).await;
    assert_eq!(body["data"]["totalViews"], 3);
    assert_eq!(body["data"]["totalVideos"], 12);

    let (status, _) = send(&app, "DELETE", "/api/v1/users/history", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", "/api/v1/users/history", Some(&access), None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn only_owners_modify_content() {
    let app = app();
    let (_, alice, _) = register_and_login(&app, "alice").await;
    let (_, bob, _) = register_and_login(&app, "bob").await;

    let (_, body) = send(&app, "POST", "/api/v1/tweets", Some(&alice), Some(json!({ "content": "hello" }))).await;
    let tweet_id = body["data"]["id"].as_str().expect("tweet id").to_string();
    let uri = format!("/api/v1/tweets/{}", tweet_id);

    let (status, _) = send(&app, "PATCH", &uri, Some(&bob), Some(json!({ "content": "hijacked" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "PATCH", &uri, Some(&alice), Some(json!({ "content": "hello world" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "hello world");

    let (status, _) = send(&app, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn playlist_flow() {
    let app = app();
    let (user_id, access, _) = register_and_login(&app, "alice").await;

    let (_, body) = send(
        &app,
        "POST",
        "/api/v1/videos",
        Some(&access),
        Some(json!({
            "title": "clip",
            "description": "d",
            "videoFile": "v.mp4",
            "thumbnail": "t.png",
            "duration": 3.5
        })),
    )
    .await;
    let video_id = body["data"]["id"].as_str().expect("video id").to_string();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/playlist",
        Some(&access),
        Some(json!({ "name": "mix", "description": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let playlist_id = body["data"]["id"].as_str().expect("playlist id").to_string();

    let add = format!("/api/v1/playlist/add/{}/{}", video_id, playlist_id);
    let (status, _) = send(&app, "PATCH", &add, Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "PATCH", &add, Some(&access), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, "GET", &format!("/api/v1/playlist/{}", playlist_id), Some(&access), None).await;
    assert_eq!(body["data"]["totalVideos"], 1);
    assert_eq!(body["data"]["videos"][0]["title"], "clip");

    let (_, body) = send(&app, "GET", &format!("/api/v1/playlist/user/{}", user_id), Some(&access), None).await;
    assert_eq!(body["data"][0]["name"], "mix");

    let remove = format!("/api/v1/playlist/remove/{}/{}", video_id, playlist_id);
    let (status, body) = send(&app, "PATCH", &remove, Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["videos"], json!([]));
}
