//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::web::errors::{error_response, HandlerError};
use crate::web::state::AppState;
use crate::web::token::verify_token;

/// Middleware that validates the `Authorization: Bearer` token and extracts the user_id.
///
/// If valid, inserts the user_id (`Uuid`) into request extensions for handlers to use.
/// A missing or malformed header is 401; a token that fails verification is 403.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HandlerError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Authentication required"))?;

    let user_id = verify_token(token, &state.config.jwt_secret).map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        error_response(StatusCode::FORBIDDEN, "Invalid token")
    })?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
