/// Database row types — these map directly to SQLite rows.
/// Distinct from talkoot-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

/// An announcement joined with its creator's username.
pub struct AnnouncementRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub location: String,
    pub time: String,
    pub slots_needed: i64,
    pub user_id: i64,
    pub username: String,
}

/// Field values for an insert or update, without row identity.
pub struct AnnouncementInput {
    pub title: String,
    pub description: String,
    pub location: String,
    pub time: String,
    pub slots_needed: i64,
}

pub struct ClassRow {
    pub title: String,
    pub value: String,
}

pub struct ClassificationRow {
    pub category: String,
    pub value: String,
}

pub struct MessageRow {
    pub id: i64,
    pub announcement_id: i64,
    pub user_id: i64,
    pub username: String,
    pub content: String,
    pub created_at: String,
}
