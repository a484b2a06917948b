use axum::{
    Router, middleware,
    routing::{get, patch, post},
};

use crate::auth::AppState;
use crate::middleware::{require_admin, require_auth};
use crate::{admin, auth, inquiries, messages, notifications};

/// The whole `/api` surface. Kept separate from the binary so tests can drive
/// it in-process.
pub fn api_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .with_state(state.clone());

    let user = Router::new()
        .route("/api/auth/user", get(auth::current_user))
        .route(
            "/api/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route(
            "/api/inquiries",
            get(inquiries::list_inquiries).post(inquiries::create_inquiry),
        )
        .route(
            "/api/notifications",
            get(notifications::list_notifications),
        )
        .route("/api/notifications/{id}/read", patch(notifications::mark_read))
        .layer(middleware::from_fn(require_auth))
        .with_state(state.clone());

    // require_auth wraps require_admin, so the role gate always sees claims
    let admin = Router::new()
        .route("/api/admin/users", get(admin::list_users))
        .route(
            "/api/admin/users/{user_id}/messages",
            get(admin::get_user_messages).post(admin::reply_to_user),
        )
        .route("/api/admin/inquiries", get(admin::list_inquiries))
        .route("/api/admin/inquiries/{id}/reply", post(admin::reply_inquiry))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    Router::new().merge(public).merge(user).merge(admin)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use parley_db::Database;

    use crate::auth::{AppStateInner, create_token, hash_password};
    use crate::middleware::jwt_secret;

    use super::api_router;

    const ADMIN_PASSWORD: &str = "admin-password";

    fn setup() -> (Router, String) {
        let db = Database::open_in_memory().unwrap();
        let secret = jwt_secret();

        let hash = hash_password(ADMIN_PASSWORD).unwrap();
        let admin = db
            .create_user("admin-1", "admin@parley.local", "Support", None, &hash, "admin")
            .unwrap();
        let admin_token = create_token(&secret, &admin).unwrap();

        let state = Arc::new(AppStateInner {
            db,
            jwt_secret: secret,
        });
        (api_router(state), admin_token)
    }

    async fn call(
        router: &Router,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_string(&v).unwrap())
            }
            None => Body::empty(),
        };
        let resp = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        let json = if bytes.is_empty() {
            json!(null)
        } else {
            serde_json::from_slice(&bytes).unwrap_or(json!(null))
        };
        (status, json)
    }

    /// Register a user and hand back (token, user id).
    async fn register(router: &Router, email: &str, name: &str) -> (String, String) {
        let (status, body) = call(
            router,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": email, "password": "password123", "displayName": name })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        (
            body["token"].as_str().unwrap().to_string(),
            body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    // -- Auth --

    #[tokio::test]
    async fn register_login_and_current_user() {
        let (router, _) = setup();
        let (token, user_id) = register(&router, "alice@example.com", "Alice").await;

        let (status, body) = call(&router, "GET", "/api/auth/user", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], user_id.as_str());
        assert_eq!(body["displayName"], "Alice");
        assert_eq!(body["role"], "user");
        assert!(body.get("password").is_none());

        let (status, body) = call(
            &router,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].as_str().unwrap().contains('.'));
    }

    #[tokio::test]
    async fn duplicate_register_conflicts() {
        let (router, _) = setup();
        register(&router, "alice@example.com", "Alice").await;

        let (status, body) = call(
            &router,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "email": "alice@example.com", "password": "password123", "displayName": "Alice II" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "email already registered");
    }

    #[tokio::test]
    async fn wrong_password_rejected() {
        let (router, _) = setup();
        register(&router, "alice@example.com", "Alice").await;

        let (status, _) = call(
            &router,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "not-the-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_token_rejected() {
        let (router, _) = setup();
        let (status, body) = call(&router, "GET", "/api/messages", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn non_admin_forbidden_on_admin_routes() {
        let (router, _) = setup();
        let (token, _) = register(&router, "alice@example.com", "Alice").await;

        let (status, body) = call(&router, "GET", "/api/admin/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Forbidden");
    }

    // -- Validation --

    #[tokio::test]
    async fn empty_message_rejected_before_storage() {
        let (router, _) = setup();
        let (token, _) = register(&router, "alice@example.com", "Alice").await;

        let (status, body) = call(
            &router,
            "POST",
            "/api/messages",
            Some(&token),
            Some(json!({ "content": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "content");

        // nothing was written
        let (_, body) = call(&router, "GET", "/api/messages", Some(&token), None).await;
        assert_eq!(body.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn empty_inquiry_subject_rejected() {
        let (router, _) = setup();
        let (token, _) = register(&router, "alice@example.com", "Alice").await;

        let (status, body) = call(
            &router,
            "POST",
            "/api/inquiries",
            Some(&token),
            Some(json!({ "subject": "", "message": "How much?" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["field"], "subject");
    }

    // -- Chat flow --

    #[tokio::test]
    async fn chat_reply_flow_orders_thread_and_notifies() {
        let (router, admin_token) = setup();
        let (token, user_id) = register(&router, "alice@example.com", "Alice").await;

        let (status, _) = call(
            &router,
            "POST",
            "/api/messages",
            Some(&token),
            Some(json!({ "content": "Hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        // alice shows up in the admin user list
        let (status, body) = call(&router, "GET", "/api/admin/users", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["id"], user_id.as_str());
        assert!(users[0]["lastMessageAt"].is_string());

        // her thread has the one user-authored message
        let path = format!("/api/admin/users/{user_id}/messages");
        let (_, body) = call(&router, "GET", &path, Some(&admin_token), None).await;
        let thread = body.as_array().unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0]["content"], "Hello");
        assert_eq!(thread[0]["isFromAdmin"], false);

        // admin replies
        let (status, body) = call(
            &router,
            "POST",
            &path,
            Some(&admin_token),
            Some(json!({ "content": "Hi there" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["isFromAdmin"], true);

        // alice sees both, in order
        let (_, body) = call(&router, "GET", "/api/messages", Some(&token), None).await;
        let thread = body.as_array().unwrap();
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0]["content"], "Hello");
        assert_eq!(thread[1]["content"], "Hi there");

        // and was notified
        let (_, body) = call(&router, "GET", "/api/notifications", Some(&token), None).await;
        let notifications = body.as_array().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0]["title"], "新着メッセージ");
        assert_eq!(notifications[0]["read"], false);

        // mark read, twice: both succeed
        let id = notifications[0]["id"].as_i64().unwrap();
        let path = format!("/api/notifications/{id}/read");
        let (status, _) = call(&router, "PATCH", &path, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&router, "PATCH", &path, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn marking_unknown_notification_is_not_found() {
        let (router, _) = setup();
        let (token, _) = register(&router, "alice@example.com", "Alice").await;

        let (status, _) = call(&router, "PATCH", "/api/notifications/999/read", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // -- Inquiry flow --

    #[tokio::test]
    async fn inquiry_reply_flow() {
        let (router, admin_token) = setup();
        let (token, _) = register(&router, "alice@example.com", "Alice").await;

        let (status, body) = call(
            &router,
            "POST",
            "/api/inquiries",
            Some(&token),
            Some(json!({ "subject": "Pricing", "message": "How much?" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        assert!(body["reply"].is_null());
        let id = body["id"].as_i64().unwrap();

        let (_, body) = call(&router, "GET", "/api/inquiries", Some(&token), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        // visible in the admin triage list
        let (_, body) = call(&router, "GET", "/api/admin/inquiries", Some(&admin_token), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let path = format!("/api/admin/inquiries/{id}/reply");
        let (status, body) = call(
            &router,
            "POST",
            &path,
            Some(&admin_token),
            Some(json!({ "reply": "It's $10" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "replied");
        assert_eq!(body["reply"], "It's $10");

        // the owner got a notification naming the subject
        let (_, body) = call(&router, "GET", "/api/notifications", Some(&token), None).await;
        let notifications = body.as_array().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0]["title"], "お問い合わせへの返信");
        assert!(
            notifications[0]["message"]
                .as_str()
                .unwrap()
                .contains("「Pricing」")
        );
    }

    #[tokio::test]
    async fn replying_to_unknown_inquiry_is_not_found() {
        let (router, admin_token) = setup();

        let (status, _) = call(
            &router,
            "POST",
            "/api/admin/inquiries/999/reply",
            Some(&admin_token),
            Some(json!({ "reply": "hello?" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
