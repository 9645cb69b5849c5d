pub mod announcements;
pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod session;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use talkoot_db::Database;

use crate::session::SessionStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionStore,
}

/// Assemble the full route table. Mutating announcement routes sit behind
/// the session middleware; everything else is public.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/", get(announcements::index))
        .route("/search", get(announcements::search))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/user/{id}", get(users::profile))
        .route("/announcement/{id}", get(announcements::detail))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/announcement/new", get(announcements::new_form))
        .route("/announcement/create", post(announcements::create))
        .route("/announcement/{id}/edit", get(announcements::edit_form))
        .route("/announcement/{id}/update", post(announcements::update))
        .route("/announcement/{id}/delete", post(announcements::delete))
        .route("/announcement/{id}/message", post(messages::post_message))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public).merge(protected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let db = Database::open_in_memory().unwrap();
        let state: AppState = Arc::new(AppStateInner {
            db,
            sessions: SessionStore::new(),
        });
        router(state)
    }

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    fn get_req(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(c) = cookie {
            builder = builder.header(header::COOKIE, c);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, username: &str) -> Response {
        send(
            app,
            post_json(
                "/register",
                None,
                json!({
                    "username": username,
                    "password": "hunter2salt",
                    "password2": "hunter2salt",
                }),
            ),
        )
        .await
    }

    /// Register and log a user in; returns (cookie header value, csrf token).
    async fn signup(app: &Router, username: &str) -> (String, String) {
        let res = register(app, username).await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = send(
            app,
            post_json(
                "/login",
                None,
                json!({"username": username, "password": "hunter2salt"}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);

        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        let body = body_json(res).await;
        (cookie, body["csrf_token"].as_str().unwrap().to_string())
    }

    async fn create_announcement(
        app: &Router,
        cookie: &str,
        csrf: &str,
        title: &str,
        classes: Value,
    ) -> i64 {
        let res = send(
            app,
            post_json(
                "/announcement/create",
                Some(cookie),
                json!({
                    "title": title,
                    "description": "need a few extra hands",
                    "location": "Kallio",
                    "time": "Saturday 10:00",
                    "slots_needed": 2,
                    "classes": classes,
                    "csrf_token": csrf,
                }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let location = res.headers().get(header::LOCATION).unwrap().to_str().unwrap();
        location.rsplit('/').next().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let app = app();
        let res = register(&app, "maija").await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = register(&app, "maija").await;
        assert_eq!(res.status(), StatusCode::CONFLICT);

        // The first account still logs in
        let res = send(
            &app,
            post_json(
                "/login",
                None,
                json!({"username": "maija", "password": "hunter2salt"}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_with_wrong_password_fails() {
        let app = app();
        assert_eq!(register(&app, "maija").await.status(), StatusCode::CREATED);

        let res = send(
            &app,
            post_json(
                "/login",
                None,
                json!({"username": "maija", "password": "not-it"}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registration_validates_password_fields() {
        let app = app();
        let res = send(
            &app,
            post_json(
                "/register",
                None,
                json!({"username": "maija", "password": "a", "password2": "b"}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = send(
            &app,
            post_json(
                "/register",
                None,
                json!({"username": "maija", "password": "", "password2": ""}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn anonymous_mutation_is_unauthorized() {
        let app = app();
        let res = send(
            &app,
            post_json(
                "/announcement/create",
                None,
                json!({
                    "title": "t", "description": "d", "location": "l",
                    "time": "t", "slots_needed": 1, "classes": [],
                    "csrf_token": "whatever",
                }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn csrf_mismatch_is_forbidden_even_with_a_valid_session() {
        let app = app();
        let (cookie, _csrf) = signup(&app, "maija").await;

        let res = send(
            &app,
            post_json(
                "/announcement/create",
                Some(&cookie),
                json!({
                    "title": "t", "description": "d", "location": "l",
                    "time": "t", "slots_needed": 1, "classes": [],
                    "csrf_token": "forged-token",
                }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        // Nothing was persisted
        let res = send(&app, get_req("/", None)).await;
        let body = body_json(res).await;
        assert_eq!(body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn only_the_owner_may_edit_update_or_delete() {
        let app = app();
        let (owner_cookie, owner_csrf) = signup(&app, "maija").await;
        let (other_cookie, other_csrf) = signup(&app, "pekka").await;

        let id = create_announcement(&app, &owner_cookie, &owner_csrf, "piano", json!([])).await;

        let res = send(
            &app,
            get_req(&format!("/announcement/{}/edit", id), Some(&other_cookie)),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = send(
            &app,
            post_json(
                &format!("/announcement/{}/update", id),
                Some(&other_cookie),
                json!({
                    "title": "hijacked", "description": "d", "location": "l",
                    "time": "t", "slots_needed": 1, "classes": [],
                    "csrf_token": other_csrf,
                }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = send(
            &app,
            post_json(
                &format!("/announcement/{}/delete", id),
                Some(&other_cookie),
                json!({"csrf_token": other_csrf}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        // Anonymous callers never even reach the ownership check
        let res = send(&app, get_req(&format!("/announcement/{}/edit", id), None)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        // Owner can still edit
        let res = send(
            &app,
            get_req(&format!("/announcement/{}/edit", id), Some(&owner_cookie)),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_classification_pair_persists_nothing() {
        let app = app();
        let (cookie, csrf) = signup(&app, "maija").await;

        let res = send(
            &app,
            post_json(
                "/announcement/create",
                Some(&cookie),
                json!({
                    "title": "t", "description": "d", "location": "l",
                    "time": "t", "slots_needed": 1,
                    "classes": ["kind:skydiving"],
                    "csrf_token": csrf,
                }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = send(&app, get_req("/", None)).await;
        let body = body_json(res).await;
        assert_eq!(body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn create_then_detail_round_trip() {
        let app = app();
        let (cookie, csrf) = signup(&app, "maija").await;
        let id = create_announcement(
            &app,
            &cookie,
            &csrf,
            "piano moving",
            json!(["urgency:high", "kind:moving"]),
        )
        .await;

        let res = send(&app, get_req(&format!("/announcement/{}", id), None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["announcement"]["title"], "piano moving");
        assert_eq!(body["announcement"]["username"], "maija");
        assert_eq!(body["classifications"].as_array().unwrap().len(), 2);
        assert_eq!(body["messages"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn update_replaces_the_classification_set() {
        let app = app();
        let (cookie, csrf) = signup(&app, "maija").await;
        let id = create_announcement(
            &app,
            &cookie,
            &csrf,
            "piano",
            json!(["urgency:high", "kind:moving"]),
        )
        .await;

        let res = send(
            &app,
            post_json(
                &format!("/announcement/{}/update", id),
                Some(&cookie),
                json!({
                    "title": "piano (updated)", "description": "d", "location": "l",
                    "time": "t", "slots_needed": 4,
                    "classes": ["urgency:low"],
                    "csrf_token": csrf,
                }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let res = send(&app, get_req(&format!("/announcement/{}", id), None)).await;
        let body = body_json(res).await;
        assert_eq!(body["announcement"]["title"], "piano (updated)");
        assert_eq!(body["announcement"]["slots_needed"], 4);
        let classifications = body["classifications"].as_array().unwrap();
        assert_eq!(classifications.len(), 1);
        assert_eq!(classifications[0]["category"], "urgency");
        assert_eq!(classifications[0]["value"], "low");
    }

    #[tokio::test]
    async fn delete_cascades_and_detail_turns_404() {
        let app = app();
        let (owner_cookie, owner_csrf) = signup(&app, "maija").await;
        let (other_cookie, other_csrf) = signup(&app, "pekka").await;

        let id = create_announcement(
            &app,
            &owner_cookie,
            &owner_csrf,
            "piano",
            json!(["urgency:high"]),
        )
        .await;

        let res = send(
            &app,
            post_json(
                &format!("/announcement/{}/message", id),
                Some(&other_cookie),
                json!({"content": "I can help", "csrf_token": other_csrf}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let res = send(
            &app,
            post_json(
                &format!("/announcement/{}/delete", id),
                Some(&owner_cookie),
                json!({"csrf_token": owner_csrf}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let res = send(&app, get_req(&format!("/announcement/{}", id), None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn message_guards_reject_owner_and_bad_lengths() {
        let app = app();
        let (owner_cookie, owner_csrf) = signup(&app, "maija").await;
        let (other_cookie, other_csrf) = signup(&app, "pekka").await;
        let id = create_announcement(&app, &owner_cookie, &owner_csrf, "piano", json!([])).await;

        // Owner may not message their own announcement
        let res = send(
            &app,
            post_json(
                &format!("/announcement/{}/message", id),
                Some(&owner_cookie),
                json!({"content": "bump", "csrf_token": owner_csrf}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        // Whitespace-only content trims to empty
        let res = send(
            &app,
            post_json(
                &format!("/announcement/{}/message", id),
                Some(&other_cookie),
                json!({"content": "   ", "csrf_token": other_csrf}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        // Over the 1000 character cap
        let res = send(
            &app,
            post_json(
                &format!("/announcement/{}/message", id),
                Some(&other_cookie),
                json!({"content": "x".repeat(1001), "csrf_token": other_csrf}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        // None of the rejected attempts left a row behind
        let res = send(&app, get_req(&format!("/announcement/{}", id), None)).await;
        let body = body_json(res).await;
        assert_eq!(body["messages"].as_array().unwrap().len(), 0);

        // A valid message goes through
        let res = send(
            &app,
            post_json(
                &format!("/announcement/{}/message", id),
                Some(&other_cookie),
                json!({"content": "I can help on Saturday", "csrf_token": other_csrf}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let res = send(&app, get_req(&format!("/announcement/{}", id), None)).await;
        let body = body_json(res).await;
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["username"], "pekka");
    }

    #[tokio::test]
    async fn search_filters_and_orders_newest_first() {
        let app = app();
        let (cookie, csrf) = signup(&app, "maija").await;
        let first = create_announcement(&app, &cookie, &csrf, "piano moving", json!([])).await;
        create_announcement(&app, &cookie, &csrf, "garden weeding", json!([])).await;
        let third = create_announcement(&app, &cookie, &csrf, "another piano job", json!([])).await;

        let res = send(&app, get_req("/search?query=piano", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        let hits = body.as_array().unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0]["id"], third);
        assert_eq!(hits[1]["id"], first);

        // Empty query bounces back to the listing
        let res = send(&app, get_req("/search?query=", None)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/");
    }

    #[tokio::test]
    async fn profile_shows_counts_and_missing_user_is_404() {
        let app = app();
        let (cookie, csrf) = signup(&app, "maija").await;
        create_announcement(&app, &cookie, &csrf, "piano", json!([])).await;
        create_announcement(&app, &cookie, &csrf, "garden", json!([])).await;

        let res = send(&app, get_req("/user/1", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["username"], "maija");
        assert_eq!(body["announcement_count"], 2);
        assert_eq!(body["announcements"].as_array().unwrap().len(), 2);

        let res = send(&app, get_req("/user/999", None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn logout_invalidates_the_session() {
        let app = app();
        let (cookie, csrf) = signup(&app, "maija").await;

        let res = send(&app, get_req("/logout", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let res = send(
            &app,
            post_json(
                "/announcement/create",
                Some(&cookie),
                json!({
                    "title": "t", "description": "d", "location": "l",
                    "time": "t", "slots_needed": 1, "classes": [],
                    "csrf_token": csrf,
                }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn new_form_returns_the_vocabulary() {
        let app = app();
        let (cookie, _) = signup(&app, "maija").await;

        let res = send(&app, get_req("/announcement/new", Some(&cookie))).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        let classes = body["classes"].as_array().unwrap();
        assert!(
            classes
                .iter()
                .any(|c| c["title"] == "urgency" && c["value"] == "high")
        );

        // Anonymous access is rejected before the handler
        let res = send(&app, get_req("/announcement/new", None)).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
