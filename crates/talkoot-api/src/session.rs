use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

/// Name of the HttpOnly cookie carrying the session id.
pub const SESSION_COOKIE: &str = "talkoot_session";

/// Server-side session data: who is logged in, plus the CSRF token every
/// mutating request must echo back.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub csrf_token: String,
}

/// In-memory session store keyed by the opaque session id from the cookie.
/// Owned by the shared application state; there is no ambient session global.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh session with a fresh CSRF token. Logging in again
    /// always issues a new token.
    pub fn create(&self, user_id: i64, username: &str) -> (String, Session) {
        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            user_id,
            username: username.to_string(),
            csrf_token: Uuid::new_v4().to_string(),
        };
        self.lock().insert(session_id.clone(), session.clone());
        (session_id, session)
    }

    pub fn get(&self, session_id: &str) -> Option<Session> {
        self.lock().get(session_id).cloned()
    }

    pub fn remove(&self, session_id: &str) {
        self.lock().remove(session_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Session>> {
        // A poisoned lock only means another request panicked mid-insert;
        // the map itself is still usable.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
