use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::info;

use talkoot_types::api::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::AppState;
use crate::error::{ApiError, run_blocking};
use crate::session::SESSION_COOKIE;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(ApiError::BadRequest("username must not be empty".into()));
    }
    if req.password.is_empty() || req.password2.is_empty() {
        return Err(ApiError::BadRequest("password must not be empty".into()));
    }
    if req.password != req.password2 {
        return Err(ApiError::BadRequest("passwords do not match".into()));
    }

    // Hash with Argon2id; the salt makes every hash unique.
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let db = state.clone();
    let name = username.clone();
    let user_id = run_blocking(move || db.db.create_user(&name, &password_hash))
        .await?
        .ok_or_else(|| ApiError::Conflict("username is already taken".into()))?;

    info!("registered user {} ({})", username, user_id);
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, username }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let username = req.username.clone();
    let user = run_blocking(move || db.db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash is corrupt: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let (session_id, session) = state.sessions.create(user.id, &user.username);

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .build();

    info!("user {} logged in", user.username);
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            user_id: user.id,
            username: user.username,
            csrf_token: session.csrf_token,
        }),
    ))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }

    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    (jar.remove(removal), Redirect::to("/"))
}
