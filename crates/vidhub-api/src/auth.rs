use axum::{
    Extension,
    body::Bytes,
    extract::State,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, instrument};
use uuid::Uuid;

use vidhub_auth::password::{hash_password, verify_password};
use vidhub_db::models::NewUser;
use vidhub_types::api::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
    TokenPairResponse,
};
use vidhub_types::models::User;

use crate::error::{ApiError, required};
use crate::extract::JsonBody;
use crate::middleware::{ACCESS_COOKIE, AuthUser, REFRESH_COOKIE};
use crate::response::{created, empty, ok};
use crate::session::{SessionPolicy, TokenPair};
use crate::state::{AppState, run_blocking};

const MIN_PASSWORD_LEN: usize = 8;

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fullname = required(&req.fullname, "fullname")?.to_string();
    let email = required(&req.email, "email")?.to_lowercase();
    let username = required(&req.username, "username")?.to_lowercase();
    let avatar = required(&req.avatar, "avatar")?.to_string();
    let cover_image = req
        .cover_image
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::InvalidArgument("username must be 3-32 characters".into()));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(ApiError::InvalidArgument("username must not contain spaces".into()));
    }
    if !email.contains('@') {
        return Err(ApiError::InvalidArgument("email is invalid".into()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::InvalidArgument(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user = run_blocking(&state, move |s| {
        if s.db.user_exists(&username, &email)? {
            return Err(ApiError::Conflict("User with email or username already exists".into()));
        }

        let password_hash = hash_password(&req.password)?;
        // a racing registration still lands on the UNIQUE index and maps to Conflict
        let row = s.db.create_user(&NewUser {
            id: Uuid::new_v4(),
            username: &username,
            email: &email,
            password_hash: &password_hash,
            fullname: &fullname,
            avatar: &avatar,
            cover_image: cover_image.as_deref(),
        })?;
        Ok(User::from(row))
    })
    .await?;

    info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(created(user, "User registered successfully"))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.as_deref().map(str::trim).filter(|u| !u.is_empty());
    let email = req.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    if username.is_none() && email.is_none() {
        return Err(ApiError::InvalidArgument("username or email is required".into()));
    }
    let username = username.map(str::to_lowercase);
    let email = email.map(str::to_lowercase);

    let (user, pair) = run_blocking(&state, move |s| {
        let row = match (username, email) {
            (Some(username), _) => s.db.get_user_by_username(&username)?,
            (None, Some(email)) => s.db.get_user_by_email(&email)?,
            (None, None) => None,
        }
        .ok_or_else(|| ApiError::NotFound("User does not exist".into()))?;

        if !verify_password(&req.password, &row.password)? {
            return Err(ApiError::Unauthorized("Invalid user credentials".into()));
        }

        let pair = s.sessions().issue(row.id, req.device.as_deref())?;
        Ok((User::from(row), pair))
    })
    .await?;

    info!(user_id = %user.id, "User logged in");
    let jar = with_token_cookies(jar, &pair);
    let body = LoginResponse {
        user,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };
    Ok((jar, ok(body, "User logged in successfully")))
}

/// Rotate the session. The refresh token comes from the `refreshToken`
/// cookie, or from `{"refreshToken": ...}` in the body.
#[instrument(skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| ApiError::InvalidArgument(format!("Invalid request body: {}", e)))?
    };

    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .or(from_body.refresh_token)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized request".into()))?;

    let pair = run_blocking(&state, move |s| s.sessions().rotate(&presented)).await?;

    let jar = with_token_cookies(jar, &pair);
    let body = TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };
    Ok((jar, ok(body, "Access token refreshed")))
}

/// Under the per-device policy only the presenting device is logged out;
/// otherwise every session of the principal ends.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let presented = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    run_blocking(&state, move |s| {
        match (s.session_policy, presented) {
            (SessionPolicy::PerDevice, Some(token)) => {
                s.sessions().revoke_current(user.id, &token)?;
            }
            _ => {
                s.sessions().revoke(user.id)?;
            }
        }
        Ok(())
    })
    .await?;

    let jar = jar
        .remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"));
    Ok((jar, ok(empty(), "User logged out")))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(req): JsonBody<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.new_password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::InvalidArgument(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    run_blocking(&state, move |s| {
        let row = s
            .db
            .get_user_by_id(user.id)?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        if !verify_password(&req.old_password, &row.password)? {
            return Err(ApiError::InvalidArgument("Invalid old password".into()));
        }

        let hash = hash_password(&req.new_password)?;
        s.db.update_password(user.id, &hash)?;
        Ok(())
    })
    .await?;

    info!("Password changed");
    Ok(ok(empty(), "Password changed successfully"))
}

fn token_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .path("/")
        .build()
}

fn with_token_cookies(jar: CookieJar, pair: &TokenPair) -> CookieJar {
    jar.add(token_cookie(ACCESS_COOKIE, pair.access_token.clone()))
        .add(token_cookie(REFRESH_COOKIE, pair.refresh_token.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidhub_auth::{TokenConfig, TokenService};
    use vidhub_db::Database;

    use crate::state::AppStateInner;

    fn state() -> AppState {
        AppStateInner::new(
            Database::open_in_memory().unwrap(),
            TokenService::new(&TokenConfig::new("access-secret", "refresh-secret")),
            SessionPolicy::Single,
        )
    }

    fn register_req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            fullname: "Alice Example".into(),
            email: email.into(),
            username: username.into(),
            password: "correct horse".into(),
            avatar: "https://cdn.example.com/a.png".into(),
            cover_image: None,
        }
    }

    fn login_req(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.into()),
            email: None,
            password: password.into(),
            device: None,
        }
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let state = state();
        assert!(register(State(state.clone()), JsonBody(register_req("alice", "a@example.com"))).await.is_ok());

        let err = register(State(state.clone()), JsonBody(register_req("Alice", "other@example.com")))
            .await
            .err();
        assert!(matches!(err, Some(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn unique_index_violation_maps_to_conflict() {
        let state = state();
        let row = NewUser {
            id: Uuid::new_v4(),
            username: "alice",
            email: "a@example.com",
            password_hash: "x",
            fullname: "Alice",
            avatar: "a.png",
            cover_image: None,
        };
        state.db.create_user(&row).unwrap();

        let err = state
            .db
            .create_user(&NewUser { id: Uuid::new_v4(), ..row })
            .map_err(ApiError::from)
            .err();
        assert!(matches!(err, Some(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let state = state();
        let mut req = register_req("alice", "a@example.com");
        req.password = "short".into();
        let err = register(State(state.clone()), JsonBody(req)).await.err();
        assert!(matches!(err, Some(ApiError::InvalidArgument(_))));

        let req = register_req("alice", "   ");
        let err = register(State(state), JsonBody(req)).await.err();
        assert!(matches!(err, Some(ApiError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn unknown_login_is_not_found() {
        let state = state();
        let err = login(State(state), CookieJar::new(), JsonBody(login_req("ghost", "whatever1")))
            .await
            .err();
        assert!(matches!(err, Some(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let state = state();
        let registered = register(State(state.clone()), JsonBody(register_req("alice", "a@example.com"))).await;
        assert!(registered.is_ok());

        let err = login(State(state.clone()), CookieJar::new(), JsonBody(login_req("alice", "wrong password")))
            .await
            .err();
        assert!(matches!(err, Some(ApiError::Unauthorized(_))));

        // correct password, any case of the username
        assert!(
            login(State(state), CookieJar::new(), JsonBody(login_req("ALICE", "correct horse")))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn login_needs_an_identifier() {
        let req = LoginRequest {
            username: None,
            email: Some("  ".into()),
            password: "correct horse".into(),
            device: None,
        };
        let err = login(State(state()), CookieJar::new(), JsonBody(req)).await.err();
        assert!(matches!(err, Some(ApiError::InvalidArgument(_))));
    }
}
