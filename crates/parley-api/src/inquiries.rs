use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use parley_db::models::InquiryRow;
use parley_types::api::CreateInquiryRequest;
use parley_types::models::Inquiry;

use crate::auth::AppState;
use crate::error::{ApiError, ApiJson, join_error, require_non_empty};
use crate::middleware::Claims;

/// The caller's own tickets, most recent first.
pub async fn list_inquiries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Inquiry>>, ApiError> {
    let db = state.clone();
    let user_id = claims.sub;
    let rows = tokio::task::spawn_blocking(move || db.db.get_inquiries(Some(&user_id)))
        .await
        .map_err(join_error)??;

    Ok(Json(rows.into_iter().map(InquiryRow::into_model).collect()))
}

pub async fn create_inquiry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateInquiryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_non_empty(&req.subject, "subject")?;
    require_non_empty(&req.message, "message")?;

    let db = state.clone();
    let user_id = claims.sub;
    let row = tokio::task::spawn_blocking(move || {
        db.db.create_inquiry(&user_id, &req.subject, &req.message)
    })
    .await
    .map_err(join_error)??;

    Ok((StatusCode::CREATED, Json(row.into_model())))
}
