use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use talkoot_types::api::{AnnouncementSummary, UserProfile};

use crate::AppState;
use crate::error::{ApiError, run_blocking};

/// GET /user/{id} — public profile: username, announcement count, and
/// the user's announcements newest first.
pub async fn profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let (user, count, announcements) = run_blocking(move || {
        let Some(user) = db.db.get_user(id)? else {
            return Ok((None, 0, vec![]));
        };
        let count = db.db.get_announcement_count(id)?;
        let announcements = db.db.get_user_announcements(id)?;
        Ok((Some(user), count, announcements))
    })
    .await?;

    let user = user.ok_or(ApiError::NotFound)?;

    Ok(Json(UserProfile {
        id: user.id,
        username: user.username,
        announcement_count: count,
        announcements: announcements
            .into_iter()
            .map(|a| AnnouncementSummary {
                id: a.id,
                title: a.title,
                description: a.description,
                location: a.location,
                time: a.time,
                slots_needed: a.slots_needed,
                user_id: a.user_id,
                username: a.username,
            })
            .collect(),
    }))
}
