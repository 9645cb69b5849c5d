use serde::{Deserialize, Serialize};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub password2: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    pub csrf_token: String,
}

// -- Announcements --

#[derive(Debug, Serialize)]
pub struct AnnouncementSummary {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub time: String,
    pub slots_needed: i64,
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub time: String,
    pub slots_needed: i64,
    /// Selected classifications as `"category:value"` pairs.
    #[serde(default)]
    pub classes: Vec<String>,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateAnnouncementRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub time: String,
    pub slots_needed: i64,
    #[serde(default)]
    pub classes: Vec<String>,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteAnnouncementRequest {
    pub csrf_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassOption {
    pub title: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationEntry {
    pub category: String,
    pub value: String,
}

/// Payload backing the posting form: the allowed vocabulary.
#[derive(Debug, Serialize)]
pub struct NewAnnouncementResponse {
    pub classes: Vec<ClassOption>,
}

/// Payload backing the edit form: current values plus the vocabulary.
#[derive(Debug, Serialize)]
pub struct EditAnnouncementResponse {
    pub announcement: AnnouncementSummary,
    pub classes: Vec<ClassOption>,
    pub selected: Vec<ClassificationEntry>,
}

#[derive(Debug, Serialize)]
pub struct AnnouncementDetail {
    pub announcement: AnnouncementSummary,
    pub classifications: Vec<ClassificationEntry>,
    pub messages: Vec<MessageView>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostMessageRequest {
    pub content: String,
    pub csrf_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub username: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// -- Users --

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub announcement_count: i64,
    pub announcements: Vec<AnnouncementSummary>,
}

// -- Errors --

/// Uniform error body for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
