use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest},
        extractors::CurrentUser,
        password::{hash_password, verify_dummy, verify_password},
    },
    error::{AppError, AppJson, StoreError},
    sessions::SessionPayload,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{3,64}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let username = payload.username.trim();

    if !is_valid_username(username) {
        warn!(username, "invalid username");
        return Err(AppError::Validation("Invalid username".into()));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::Validation("Password too short".into()));
    }

    if state.users.find_by_username(username).await?.is_some() {
        warn!(username, "username already registered");
        return Err(AppError::Conflict("Username already taken".into()));
    }

    let hash = hash_password(payload.password).await?;

    // the unique index still decides when two registrations race
    let user = state
        .users
        .create(username, &hash)
        .await
        .map_err(|e| match e {
            StoreError::Conflict => AppError::Conflict("Username already taken".into()),
            other => other.into(),
        })?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(&user))))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(CookieJar, Json<PublicUser>), AppError> {
    let username = payload.username.trim();

    let Some(user) = state.users.find_by_username(username).await? else {
        verify_dummy(payload.password).await?;
        warn!(username, "login unknown username");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(payload.password, user.password_hash.clone()).await? {
        warn!(username, user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    if let Some(previous) = state.sessions.token_from(&jar) {
        state.sessions.destroy(&previous).await?;
    }

    let token = state
        .sessions
        .issue(&SessionPayload {
            username: user.username.clone(),
            user_id: user.id,
        })
        .await?;

    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok((
        jar.add(state.sessions.cookie(token)),
        Json(PublicUser::from(&user)),
    ))
}

#[instrument(skip(state, jar))]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, &'static str), AppError> {
    if let Some(token) = state.sessions.token_from(&jar) {
        state.sessions.destroy(&token).await?;
        info!("session destroyed");
    }
    Ok((
        jar.remove(state.sessions.removal_cookie()),
        "Logged out successfully",
    ))
}

#[instrument(skip_all, fields(user_id = user.user_id))]
pub async fn get_me(user: CurrentUser) -> Json<PublicUser> {
    Json(PublicUser {
        id: user.user_id,
        username: user.username,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(is_valid_username("testuser"));
        assert!(is_valid_username("jane.doe-42_x"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username(&"x".repeat(65)));
    }

    #[test]
    fn public_user_serialization_has_no_hash() {
        let json = serde_json::to_string(&PublicUser {
            id: 3,
            username: "testuser".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"id":3,"username":"testuser"}"#);
    }
}
