use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use parley_db::models::MessageRow;
use parley_types::api::SendMessageRequest;
use parley_types::models::Message;

use crate::auth::AppState;
use crate::error::{ApiError, ApiJson, join_error, require_non_empty};
use crate::middleware::Claims;

/// The caller's own thread, oldest first.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Message>>, ApiError> {
    // Run blocking DB work off the async runtime
    let db = state.clone();
    let user_id = claims.sub;
    let rows = tokio::task::spawn_blocking(move || db.db.get_messages(&user_id))
        .await
        .map_err(join_error)??;

    Ok(Json(rows.into_iter().map(MessageRow::into_model).collect()))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_non_empty(&req.content, "content")?;

    let db = state.clone();
    let user_id = claims.sub;
    let row = tokio::task::spawn_blocking(move || db.db.create_message(&user_id, &req.content, false))
        .await
        .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(row.into_model())))
}
