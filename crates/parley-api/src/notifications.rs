use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use parley_db::models::NotificationRow;
use parley_types::models::Notification;

use crate::auth::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::Claims;

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let db = state.clone();
    let user_id = claims.sub;
    let rows = tokio::task::spawn_blocking(move || db.db.get_notifications(&user_id))
        .await
        .map_err(join_error)??;

    Ok(Json(
        rows.into_iter().map(NotificationRow::into_model).collect(),
    ))
}

/// Marking twice is fine; marking an id that was never created is 404.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let matched = tokio::task::spawn_blocking(move || db.db.mark_notification_read(id))
        .await
        .map_err(join_error)??;

    if !matched {
        return Err(ApiError::NotFound("notification not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}
