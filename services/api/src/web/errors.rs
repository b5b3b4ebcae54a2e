//! services/api/src/web/errors.rs
//!
//! The JSON error body and the mapping from core errors to HTTP statuses.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    Json,
};
use contract_core::domain::FieldError;
use contract_core::ports::PortError;
use serde::Serialize;
use tracing::{error, warn};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldErrorBody {
    pub field: String,
    pub message: String,
}

impl From<FieldError> for FieldErrorBody {
    fn from(e: FieldError) -> Self {
        Self {
            field: e.field,
            message: e.message,
        }
    }
}

/// Body of every non-2xx JSON response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldErrorBody>,
}

pub type HandlerError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
            error: None,
            errors: Vec::new(),
        }),
    )
}

pub fn validation_response(errors: Vec<FieldError>) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            message: "Validation failed".to_string(),
            error: None,
            errors: errors.into_iter().map(FieldErrorBody::from).collect(),
        }),
    )
}

/// Maps a core error to a response. `context` names the failed operation
/// and becomes the message for server-side failures.
pub fn port_error(context: &str, e: PortError) -> HandlerError {
    match e {
        PortError::Validation(errors) => validation_response(errors),
        PortError::NotFound(message) => error_response(StatusCode::NOT_FOUND, message),
        PortError::Unauthorized => {
            error_response(StatusCode::UNAUTHORIZED, "Authentication required")
        }
        PortError::AiDelegate(message) => {
            error!("{}: {}", context, message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    message: context.to_string(),
                    error: Some(message),
                    errors: Vec::new(),
                }),
            )
        }
        PortError::Unexpected(message) => {
            error!("{}: {}", context, message);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, context)
        }
    }
}

/// Malformed or mistyped JSON bodies are client errors.
pub fn json_rejection(rejection: JsonRejection) -> HandlerError {
    warn!("Rejected request body: {}", rejection.body_text());
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            message: "Invalid request body".to_string(),
            error: Some(rejection.body_text()),
            errors: Vec::new(),
        }),
    )
}

/// An id that does not parse cannot name an existing `resource`.
pub fn path_rejection(resource: &str, rejection: PathRejection) -> HandlerError {
    warn!("Rejected path parameter: {}", rejection.body_text());
    error_response(StatusCode::NOT_FOUND, format!("{resource} not found"))
}
