use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use tracing::warn;

use talkoot_db::models::MessageRow;
use talkoot_types::api::{MessageView, PostMessageRequest};

use crate::AppState;
use crate::error::{ApiError, run_blocking};
use crate::middleware::{CurrentUser, check_csrf};

const MAX_MESSAGE_CHARS: usize = 1000;

/// POST /announcement/{id}/message — leave a note on someone else's
/// announcement.
pub async fn post_message(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_csrf(&user, &req.csrf_token)?;

    let db = state.clone();
    let announcement = run_blocking(move || db.db.get_announcement(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    // Owners answer in person, not on their own board entry.
    if announcement.user_id == user.user_id {
        warn!(
            "user {} tried to message their own announcement {}",
            user.user_id, id
        );
        return Err(ApiError::Forbidden);
    }

    let content = req.content.trim().to_string();
    if content.is_empty() || content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::BadRequest(
            "message must be between 1 and 1000 characters".into(),
        ));
    }

    let db = state.clone();
    let user_id = user.user_id;
    run_blocking(move || db.db.add_message(id, user_id, &content)).await?;

    Ok(Redirect::to(&format!("/announcement/{}", id)))
}

pub(crate) fn message_view(row: MessageRow) -> MessageView {
    MessageView {
        id: row.id,
        content: row.content,
        user_id: row.user_id,
        username: row.username,
        created_at: parse_store_timestamp(&row.created_at, row.id),
    }
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert; fall back to RFC 3339 for values
/// written by other tooling.
fn parse_store_timestamp(raw: &str, message_id: i64) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!(
                "corrupt created_at {:?} on message {}: {}",
                raw, message_id, e
            );
            chrono::DateTime::default()
        })
}
