use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::ApiError;
use crate::session::SESSION_COOKIE;

/// The authenticated caller, injected as a request extension by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: i64,
    pub username: String,
    pub csrf_token: String,
}

/// Resolve the session cookie against the store. Missing or unknown
/// cookie ⇒ 401 before the handler runs.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let session_id = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(ApiError::Unauthorized)?;

    let session = state
        .sessions
        .get(&session_id)
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(CurrentUser {
        user_id: session.user_id,
        username: session.username,
        csrf_token: session.csrf_token,
    });
    Ok(next.run(req).await)
}

/// Compare a submitted token against the session's stored token.
/// Mismatch or absence is a hard 403; the two tokens must be equal.
pub fn check_csrf(user: &CurrentUser, submitted: &str) -> Result<(), ApiError> {
    if submitted.is_empty() || submitted != user.csrf_token {
        tracing::warn!("CSRF token mismatch for user {}", user.user_id);
        return Err(ApiError::Forbidden);
    }
    Ok(())
}
