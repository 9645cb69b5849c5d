use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use talkoot_db::models::{AnnouncementInput, AnnouncementRow, ClassRow};
use talkoot_types::api::{
    AnnouncementDetail, AnnouncementSummary, ClassOption, ClassificationEntry,
    CreateAnnouncementRequest, DeleteAnnouncementRequest, EditAnnouncementResponse,
    NewAnnouncementResponse, UpdateAnnouncementRequest,
};

use crate::AppState;
use crate::error::{ApiError, run_blocking};
use crate::messages::message_view;
use crate::middleware::{CurrentUser, check_csrf};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

/// GET / — all announcements, newest first.
pub async fn index(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = run_blocking(move || db.db.get_announcements()).await?;
    let list: Vec<AnnouncementSummary> = rows.into_iter().map(to_summary).collect();
    Ok(Json(list))
}

/// GET /search?query= — substring match on title or description.
/// An empty query just goes back to the listing.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let keyword = params.query.trim().to_string();
    if keyword.is_empty() {
        return Ok(Redirect::to("/").into_response());
    }

    let db = state.clone();
    let rows = run_blocking(move || db.db.find_announcements(&keyword)).await?;
    let list: Vec<AnnouncementSummary> = rows.into_iter().map(to_summary).collect();
    Ok(Json(list).into_response())
}

/// GET /announcement/new — the vocabulary the posting form offers.
pub async fn new_form(
    State(state): State<AppState>,
    Extension(_user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let classes = run_blocking(move || db.db.get_classes()).await?;
    Ok(Json(NewAnnouncementResponse {
        classes: classes.into_iter().map(to_option).collect(),
    }))
}

/// POST /announcement/create
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreateAnnouncementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_csrf(&user, &req.csrf_token)?;

    let input = validate_fields(
        &req.title,
        &req.description,
        &req.location,
        &req.time,
        req.slots_needed,
    )?;

    let db = state.clone();
    let vocabulary = run_blocking(move || db.db.get_classes()).await?;
    let classes = validate_classes(&req.classes, &vocabulary)?;

    let db = state.clone();
    let user_id = user.user_id;
    let id = run_blocking(move || db.db.create_announcement(&input, user_id, &classes)).await?;

    info!("user {} created announcement {}", user.user_id, id);
    Ok(Redirect::to(&format!("/announcement/{}", id)))
}

/// GET /announcement/{id} — detail with classifications and messages.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let (announcement, classifications, messages) = run_blocking(move || {
        let Some(announcement) = db.db.get_announcement(id)? else {
            return Ok((None, vec![], vec![]));
        };
        let classifications = db.db.get_classifications(id)?;
        let messages = db.db.get_messages(id)?;
        Ok((Some(announcement), classifications, messages))
    })
    .await?;

    let announcement = announcement.ok_or(ApiError::NotFound)?;

    Ok(Json(AnnouncementDetail {
        announcement: to_summary(announcement),
        classifications: classifications
            .into_iter()
            .map(|c| ClassificationEntry {
                category: c.category,
                value: c.value,
            })
            .collect(),
        messages: messages.into_iter().map(message_view).collect(),
    }))
}

/// GET /announcement/{id}/edit — current values for the edit form.
/// Owner only.
pub async fn edit_form(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let announcement = fetch_owned(&state, id, &user).await?;

    let db = state.clone();
    let (classes, selected) = run_blocking(move || {
        Ok((db.db.get_classes()?, db.db.get_classifications(id)?))
    })
    .await?;

    Ok(Json(EditAnnouncementResponse {
        announcement: to_summary(announcement),
        classes: classes.into_iter().map(to_option).collect(),
        selected: selected
            .into_iter()
            .map(|c| ClassificationEntry {
                category: c.category,
                value: c.value,
            })
            .collect(),
    }))
}

/// POST /announcement/{id}/update — field update plus a full replace of
/// the classification set.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateAnnouncementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_csrf(&user, &req.csrf_token)?;
    fetch_owned(&state, id, &user).await?;

    let input = validate_fields(
        &req.title,
        &req.description,
        &req.location,
        &req.time,
        req.slots_needed,
    )?;

    let db = state.clone();
    let vocabulary = run_blocking(move || db.db.get_classes()).await?;
    let classes = validate_classes(&req.classes, &vocabulary)?;

    let db = state.clone();
    run_blocking(move || db.db.update_announcement(id, &input, &classes)).await?;

    Ok(Redirect::to(&format!("/announcement/{}", id)))
}

/// POST /announcement/{id}/delete — removes the announcement together
/// with its classification and message rows.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<DeleteAnnouncementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    check_csrf(&user, &req.csrf_token)?;
    fetch_owned(&state, id, &user).await?;

    let db = state.clone();
    run_blocking(move || db.db.delete_announcement(id)).await?;

    info!("user {} deleted announcement {}", user.user_id, id);
    Ok(Redirect::to("/"))
}

/// Fetch an announcement and require the caller to be its owner.
/// Missing id ⇒ 404, someone else's announcement ⇒ 403.
pub(crate) async fn fetch_owned(
    state: &AppState,
    id: i64,
    user: &CurrentUser,
) -> Result<AnnouncementRow, ApiError> {
    let db = state.clone();
    let announcement = run_blocking(move || db.db.get_announcement(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    if announcement.user_id != user.user_id {
        warn!(
            "user {} attempted to modify announcement {} owned by {}",
            user.user_id, id, announcement.user_id
        );
        return Err(ApiError::Forbidden);
    }
    Ok(announcement)
}

fn to_summary(row: AnnouncementRow) -> AnnouncementSummary {
    AnnouncementSummary {
        id: row.id,
        title: row.title,
        description: row.description,
        location: row.location,
        time: row.time,
        slots_needed: row.slots_needed,
        user_id: row.user_id,
        username: row.username,
    }
}

fn to_option(row: ClassRow) -> ClassOption {
    ClassOption {
        title: row.title,
        value: row.value,
    }
}

fn validate_fields(
    title: &str,
    description: &str,
    location: &str,
    time: &str,
    slots_needed: i64,
) -> Result<AnnouncementInput, ApiError> {
    let title = title.trim();
    let description = description.trim();
    let location = location.trim();
    let time = time.trim();

    if title.is_empty() || description.is_empty() || location.is_empty() || time.is_empty() {
        return Err(ApiError::BadRequest("all fields are required".into()));
    }
    if slots_needed < 1 {
        return Err(ApiError::BadRequest(
            "slots needed must be at least 1".into(),
        ));
    }

    Ok(AnnouncementInput {
        title: title.to_string(),
        description: description.to_string(),
        location: location.to_string(),
        time: time.to_string(),
        slots_needed,
    })
}

/// Parse submitted `"category:value"` pairs and check every one against
/// the seeded vocabulary. Malformed or unknown pairs reject the whole
/// request with 403.
fn validate_classes(
    submitted: &[String],
    vocabulary: &[ClassRow],
) -> Result<Vec<(String, String)>, ApiError> {
    let mut selected = Vec::with_capacity(submitted.len());
    for entry in submitted {
        let Some((category, value)) = entry.split_once(':') else {
            warn!("malformed classification entry {:?}", entry);
            return Err(ApiError::Forbidden);
        };
        let known = vocabulary
            .iter()
            .any(|c| c.title == category && c.value == value);
        if !known {
            warn!("unknown classification pair {:?}", entry);
            return Err(ApiError::Forbidden);
        }
        selected.push((category.to_string(), value.to_string()));
    }
    Ok(selected)
}
