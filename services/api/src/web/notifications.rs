//! services/api/src/web/notifications.rs
//!
//! Read-mostly endpoints for the caller's AI consultation log and notifications.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use contract_core::ports::PortError;
use std::sync::Arc;
use uuid::Uuid;

use crate::web::dto::{ConsultationResponse, NotificationResponse};
use crate::web::errors::{path_rejection, port_error, ErrorResponse, HandlerError};
use crate::web::state::AppState;

#[utoipa::path(
    get,
    path = "/consultations",
    tag = "Activity",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's AI consultations, newest first", body = [ConsultationResponse]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn list_consultations_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let consultations = state
        .db
        .list_consultations_by_user(user_id)
        .await
        .map_err(|e| port_error("Error listing consultations", e))?;
    let body: Vec<ConsultationResponse> = consultations.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Activity",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's notifications, newest first", body = [NotificationResponse]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let notifications = state
        .db
        .list_notifications_by_user(user_id)
        .await
        .map_err(|e| port_error("Error listing notifications", e))?;
    let body: Vec<NotificationResponse> = notifications.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

/// Mark one of the caller's notifications as seen.
#[utoipa::path(
    put,
    path = "/notifications/{id}/seen",
    tag = "Activity",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Updated notification", body = NotificationResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Notification not found", body = ErrorResponse)
    )
)]
pub async fn mark_notification_seen_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Path(id) = id.map_err(|r| path_rejection("Notification", r))?;
    let context = "Error updating notification";
    let not_found = || PortError::NotFound(format!("Notification {id} not found"));

    match state.db.get_notification_by_id(id).await {
        Ok(n) if n.user_id == user_id => {}
        Ok(_) | Err(PortError::NotFound(_)) => return Err(port_error(context, not_found())),
        Err(e) => return Err(port_error(context, e)),
    }
    let notification = state
        .db
        .mark_notification_seen(id)
        .await
        .map_err(|e| port_error(context, e))?;
    Ok(Json(NotificationResponse::from(notification)))
}
