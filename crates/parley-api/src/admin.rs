//! Admin console handlers. Every route here sits behind `require_admin`; the
//! replies fan a notification out to the affected user in the same storage
//! transaction as the primary write.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use parley_db::models::{InquiryRow, MessageRow, UserChatRow};
use parley_types::api::{ReplyInquiryRequest, SendMessageRequest};
use parley_types::models::{Inquiry, Message, UserWithLastMessage};

use crate::auth::AppState;
use crate::error::{ApiError, ApiJson, join_error, require_non_empty};

const NEW_MESSAGE_TITLE: &str = "新着メッセージ";
const NEW_MESSAGE_BODY: &str = "管理者から新しいメッセージが届きました。";
const INQUIRY_REPLY_TITLE: &str = "お問い合わせへの返信";

/// Users with at least one message, most recently active first.
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserWithLastMessage>>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.users_with_chats())
        .await
        .map_err(join_error)??;

    Ok(Json(rows.into_iter().map(UserChatRow::into_model).collect()))
}

/// One user's thread, as the admin console renders it.
pub async fn get_user_messages(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.get_messages(&user_id))
        .await
        .map_err(join_error)??;

    Ok(Json(rows.into_iter().map(MessageRow::into_model).collect()))
}

pub async fn reply_to_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_non_empty(&req.content, "content")?;

    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || {
        db.db
            .create_admin_message(&user_id, &req.content, NEW_MESSAGE_TITLE, NEW_MESSAGE_BODY)
    })
    .await
    .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(row.into_model())))
}

/// Every ticket in the system, most recent first.
pub async fn list_inquiries(State(state): State<AppState>) -> Result<Json<Vec<Inquiry>>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.get_inquiries(None))
        .await
        .map_err(join_error)??;

    Ok(Json(rows.into_iter().map(InquiryRow::into_model).collect()))
}

pub async fn reply_inquiry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<ReplyInquiryRequest>,
) -> Result<Json<Inquiry>, ApiError> {
    require_non_empty(&req.reply, "reply")?;

    let db = state.clone();
    let updated = tokio::task::spawn_blocking(move || {
        db.db.reply_to_inquiry(id, &req.reply, |inquiry| {
            (
                INQUIRY_REPLY_TITLE.to_string(),
                format!("「{}」へのお問い合わせに返信がありました。", inquiry.subject),
            )
        })
    })
    .await
    .map_err(join_error)??;

    let inquiry = updated.ok_or_else(|| ApiError::NotFound("inquiry not found".into()))?;
    Ok(Json(inquiry.into_model()))
}
