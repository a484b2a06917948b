//! Drives the real router over HTTP: register, chat, admin reply, inquiry
//! triage, notifications — through the typed client and a live poller.

use std::sync::Arc;
use std::time::Duration;

use parley_api::auth::{AppStateInner, hash_password};
use parley_api::middleware::jwt_secret;
use parley_api::routes::api_router;
use parley_client::{ApiClient, ClientError, Phase, Poller};
use parley_client::poller::CHAT_POLL_INTERVAL;
use parley_db::Database;
use parley_types::api::{LoginRequest, RegisterRequest};

const ADMIN_EMAIL: &str = "admin@parley.local";
const ADMIN_PASSWORD: &str = "admin-password";

async fn spawn_server() -> String {
    let db = Database::open_in_memory().unwrap();
    let hash = hash_password(ADMIN_PASSWORD).unwrap();
    db.create_user("admin-1", ADMIN_EMAIL, "Support", None, &hash, "admin")
        .unwrap();

    let state = Arc::new(AppStateInner {
        db,
        jwt_secret: jwt_secret(),
    });
    let router = api_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}

async fn registered_client(base: &str, email: &str, name: &str) -> ApiClient {
    let mut client = ApiClient::new(base);
    let auth = client
        .register(&RegisterRequest {
            email: email.into(),
            password: "password123".into(),
            display_name: name.into(),
            profile_image_url: None,
        })
        .await
        .unwrap();
    client.set_token(auth.token);
    client
}

async fn admin_client(base: &str) -> ApiClient {
    let mut client = ApiClient::new(base);
    let auth = client
        .login(&LoginRequest {
            email: ADMIN_EMAIL.into(),
            password: ADMIN_PASSWORD.into(),
        })
        .await
        .unwrap();
    client.set_token(auth.token);
    client
}

#[tokio::test(flavor = "multi_thread")]
async fn support_flow_end_to_end() {
    let base = spawn_server().await;
    let alice = registered_client(&base, "alice@example.com", "Alice").await;
    let admin = admin_client(&base).await;

    let me = alice.current_user().await.unwrap();
    assert_eq!(me.display_name, "Alice");

    // alice opens the conversation
    alice.send_message("Hello").await.unwrap();

    // her thread, seen through a live poller
    let thread_client = alice.clone();
    let poller = Poller::spawn(CHAT_POLL_INTERVAL, move || {
        let client = thread_client.clone();
        async move { client.messages().await }
    });
    let mut thread = poller.subscribe();

    let snapshot = tokio::time::timeout(
        Duration::from_secs(10),
        thread.wait_for(|s| s.phase == Phase::Rendered),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    let messages = snapshot.data.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "Hello");
    assert!(!messages[0].is_from_admin);

    // the admin sees alice in the active-thread list and replies
    let users = admin.admin_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, me.id);

    let reply = admin.admin_reply(&me.id, "Hi there").await.unwrap();
    assert!(reply.is_from_admin);

    let admin_view = admin.admin_user_messages(&me.id).await.unwrap();
    assert_eq!(admin_view.len(), 2);

    // the mutation invalidates the view; the poller catches up out of cycle
    poller.invalidate();
    let snapshot = tokio::time::timeout(
        Duration::from_secs(10),
        thread.wait_for(|s| s.data.as_ref().is_some_and(|m| m.len() == 2)),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();
    let messages = snapshot.data.unwrap();
    assert_eq!(messages[0].content, "Hello");
    assert_eq!(messages[1].content, "Hi there");

    // the reply produced exactly one notification
    let notifications = alice.notifications().await.unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "新着メッセージ");
    assert!(!notifications[0].read);

    alice
        .mark_notification_read(notifications[0].id)
        .await
        .unwrap();
    // idempotent
    alice
        .mark_notification_read(notifications[0].id)
        .await
        .unwrap();
    let notifications = alice.notifications().await.unwrap();
    assert!(notifications[0].read);

    // inquiry ticket round trip
    let inquiry = alice.create_inquiry("Pricing", "How much?").await.unwrap();
    assert_eq!(alice.inquiries().await.unwrap().len(), 1);
    assert_eq!(admin.admin_inquiries().await.unwrap().len(), 1);

    let replied = admin
        .admin_reply_inquiry(inquiry.id, "It's $10")
        .await
        .unwrap();
    assert_eq!(replied.reply.as_deref(), Some("It's $10"));

    let notifications = alice.notifications().await.unwrap();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].title, "お問い合わせへの返信");
    assert!(notifications[0].message.contains("「Pricing」"));
}

#[tokio::test(flavor = "multi_thread")]
async fn admin_routes_are_closed_to_users() {
    let base = spawn_server().await;
    let alice = registered_client(&base, "alice@example.com", "Alice").await;

    let err = alice.admin_users().await.unwrap_err();
    match err {
        ClientError::Api { status, .. } => assert_eq!(status.as_u16(), 403),
        other => panic!("unexpected error: {other}"),
    }
}
