//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, and the account view.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use contract_core::domain::{User, DEFAULT_PLAN_NAME};
use contract_core::ports::PortError;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::web::dto::{AccountResponse, AuthResponse, LoginRequest, RegisterRequest};
use crate::web::errors::{
    error_response, json_rejection, port_error, validation_response, ErrorResponse, HandlerError,
};
use crate::web::state::AppState;
use crate::web::token::issue_token;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn auth_response(state: &AppState, user: User) -> Result<AuthResponse, HandlerError> {
    let token = issue_token(user.id, &state.config.jwt_secret, state.config.token_ttl_hours)
        .map_err(|e| {
            error!("Failed to sign token for user {}: {:?}", user.id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to issue token")
        })?;
    Ok(AuthResponse {
        token,
        user: user.into(),
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account on the Free plan
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Accounts",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Invalid request or email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(req) = payload.map_err(json_rejection)?;
    req.validate().map_err(validation_response)?;

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password")
        })?
        .to_string();

    // 2. Create the user on the default plan
    let plan = state
        .db
        .get_plan_by_name(DEFAULT_PLAN_NAME)
        .await
        .map_err(|e| port_error("Failed to create user", e))?;
    let user = state
        .db
        .create_user(req.name.trim(), req.email.trim(), &password_hash, plan.id)
        .await
        .map_err(|e| port_error("Failed to create user", e))?;
    info!("Registered user {} on plan {}", user.id, plan.name);

    // 3. Hand back a token
    let response = auth_response(&state, user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Accounts",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(req) = payload.map_err(json_rejection)?;

    // 1. Get credentials by email
    let creds = match state.db.get_user_credentials_by_email(req.email.trim()).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => {
            return Err(error_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS))
        }
        Err(e) => return Err(port_error("Login failed", e)),
    };

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&creds.password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Authentication error")
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(error_response(StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS));
    }

    let user = state
        .db
        .get_user_by_id(creds.user_id)
        .await
        .map_err(|e| port_error("Login failed", e))?;
    let response = auth_response(&state, user)?;
    Ok((StatusCode::OK, Json(response)))
}

/// GET /account - The caller, their plan, and quota usage
#[utoipa::path(
    get,
    path = "/account",
    tag = "Accounts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Account details", body = AccountResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Invalid token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn account_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let context = "Error loading account";
    let user = state
        .db
        .get_user_by_id(user_id)
        .await
        .map_err(|e| port_error(context, e))?;
    let plan = state
        .db
        .get_plan_by_id(user.plan_id)
        .await
        .map_err(|e| port_error(context, e))?;
    let usage = state
        .db
        .get_usage_for_user(user_id)
        .await
        .map_err(|e| port_error(context, e))?;

    Ok(Json(AccountResponse::new(user, plan, usage)))
}
