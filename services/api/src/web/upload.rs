//! services/api/src/web/upload.rs
//!
//! Upload endpoints: receive an existing contract file, extract its fields,
//! and list what the caller has uploaded.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::web::dto::{DocumentResponse, UploadResponse};
use crate::web::errors::{error_response, port_error, ErrorResponse, HandlerError};
use crate::web::state::AppState;

/// Upload a contract file (PDF or text) for field extraction.
///
/// Accepts a multipart/form-data request with a `file` part.
#[utoipa::path(
    post,
    path = "/upload/contract",
    tag = "Uploads",
    security(("bearer_auth" = [])),
    request_body(content_type = "multipart/form-data", description = "The contract file, in a part named `file`."),
    responses(
        (status = 200, description = "Extracted contract fields and the stored document", body = UploadResponse),
        (status = 400, description = "No file in the request", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 500, description = "Extraction or storage failed", body = ErrorResponse)
    )
)]
pub async fn upload_contract_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let unreadable = |e: axum::extract::multipart::MultipartError| {
        warn!("Failed to read multipart data: {}", e);
        error_response(StatusCode::BAD_REQUEST, "Failed to read uploaded file")
    };

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("contract.pdf").to_string();
        let data = field.bytes().await.map_err(unreadable)?;
        upload = Some((file_name, data));
        break;
    }
    let (file_name, data) =
        upload.ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "No file uploaded"))?;

    let outcome = state
        .uploads
        .upload_contract(user_id, &file_name, &data)
        .await
        .map_err(|e| port_error("Error processing uploaded contract", e))?;

    Ok(Json(UploadResponse::from(outcome)))
}

/// List the caller's uploaded documents, newest first.
#[utoipa::path(
    get,
    path = "/upload/contracts",
    tag = "Uploads",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's documents", body = [DocumentResponse]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn list_uploaded_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let documents = state
        .uploads
        .list_uploaded(user_id)
        .await
        .map_err(|e| port_error("Error listing uploaded contracts", e))?;
    let body: Vec<DocumentResponse> = documents.into_iter().map(Into::into).collect();
    Ok(Json(body))
}
