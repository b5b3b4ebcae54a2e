//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the contract endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::dto::{
    AccountResponse, AccountUsage, AnalysisResponse, AuthResponse, ConsultationResponse,
    ContractRequest, ContractResponse, DocumentResponse, ExtractedDurationBody,
    ExtractedPartyBody, ExtractedPaymentBody, GenerateContractRequest, GenerateContractResponse,
    LoginRequest, NotificationResponse, PlanResponse, QuotaUsage, RegisterRequest,
    UploadResponse, UserResponse,
};
use crate::web::errors::{
    json_rejection, path_rejection, port_error, validation_response, ErrorResponse, FieldErrorBody,
    HandlerError,
};
use crate::web::state::AppState;
use crate::web::{auth, notifications, upload};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use contract_core::ports::PortError;
use std::sync::Arc;
use tracing::info;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register_handler,
        auth::login_handler,
        auth::account_handler,
        create_contract_handler,
        list_contracts_handler,
        get_contract_handler,
        update_contract_handler,
        delete_contract_handler,
        generate_contract_handler,
        analyze_contract_handler,
        export_contract_handler,
        upload::upload_contract_handler,
        upload::list_uploaded_handler,
        notifications::list_consultations_handler,
        notifications::list_notifications_handler,
        notifications::mark_notification_seen_handler,
    ),
    components(
        schemas(
            ErrorResponse, FieldErrorBody,
            RegisterRequest, LoginRequest, AuthResponse, UserResponse,
            AccountResponse, PlanResponse, AccountUsage, QuotaUsage,
            ContractRequest, ContractResponse,
            GenerateContractRequest, GenerateContractResponse, AnalysisResponse,
            UploadResponse, DocumentResponse, ExtractedPartyBody, ExtractedDurationBody,
            ExtractedPaymentBody,
            ConsultationResponse, NotificationResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Accounts", description = "Registration, login and plan usage."),
        (name = "Contracts", description = "Contract storage, AI drafting, risk analysis and PDF export."),
        (name = "Uploads", description = "Uploading existing contracts for field extraction."),
        (name = "Activity", description = "AI consultation history and notifications.")
    )
)]
pub struct ApiDoc;

/// Registers the bearer scheme referenced by protected paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

//=========================================================================================
// Contract CRUD
//=========================================================================================

/// Create a contract owned by the caller. Starts in `DRAFT`.
#[utoipa::path(
    post,
    path = "/contracts",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    request_body = ContractRequest,
    responses(
        (status = 201, description = "Contract created", body = ContractResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn create_contract_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    payload: Result<Json<ContractRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(req) = payload.map_err(json_rejection)?;
    let contract = state
        .contracts
        .create(user_id, req.into_input())
        .await
        .map_err(|e| port_error("Error creating contract", e))?;
    Ok((StatusCode::CREATED, Json(ContractResponse::from(contract))))
}

/// List the caller's contracts, newest first.
#[utoipa::path(
    get,
    path = "/contracts",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's contracts", body = [ContractResponse]),
        (status = 401, description = "Authentication required", body = ErrorResponse)
    )
)]
pub async fn list_contracts_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let contracts = state
        .contracts
        .find_all(user_id)
        .await
        .map_err(|e| port_error("Error listing contracts", e))?;
    let body: Vec<ContractResponse> = contracts.into_iter().map(Into::into).collect();
    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/contracts/{id}",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract id")),
    responses(
        (status = 200, description = "The contract", body = ContractResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Contract not found", body = ErrorResponse)
    )
)]
pub async fn get_contract_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Path(id) = id.map_err(|r| path_rejection("Contract", r))?;
    let contract = state
        .contracts
        .find_by_id(id, user_id)
        .await
        .map_err(|e| port_error("Error fetching contract", e))?;
    Ok(Json(ContractResponse::from(contract)))
}

/// Partially update a contract. Absent fields are left unchanged.
#[utoipa::path(
    put,
    path = "/contracts/{id}",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract id")),
    request_body = ContractRequest,
    responses(
        (status = 200, description = "Updated contract", body = ContractResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Contract not found", body = ErrorResponse)
    )
)]
pub async fn update_contract_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ContractRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Path(id) = id.map_err(|r| path_rejection("Contract", r))?;
    let Json(req) = payload.map_err(json_rejection)?;
    let patch = req.into_patch().map_err(validation_response)?;
    let contract = state
        .contracts
        .update(id, user_id, patch)
        .await
        .map_err(|e| port_error("Error updating contract", e))?;
    Ok(Json(ContractResponse::from(contract)))
}

#[utoipa::path(
    delete,
    path = "/contracts/{id}",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract id")),
    responses(
        (status = 204, description = "Contract deleted"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Contract not found", body = ErrorResponse)
    )
)]
pub async fn delete_contract_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Path(id) = id.map_err(|r| path_rejection("Contract", r))?;
    state
        .contracts
        .delete(id, user_id)
        .await
        .map_err(|e| port_error("Error deleting contract", e))?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// AI Drafting, Analysis and Export
//=========================================================================================

/// Draft contract text from structured fields. Nothing is persisted.
#[utoipa::path(
    post,
    path = "/contracts/generate",
    tag = "Contracts",
    request_body = GenerateContractRequest,
    responses(
        (status = 200, description = "Generated contract text", body = GenerateContractResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "The AI delegate failed", body = ErrorResponse)
    )
)]
pub async fn generate_contract_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateContractRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Json(req) = payload.map_err(json_rejection)?;
    let draft = req.into_draft().map_err(validation_response)?;
    let content = state
        .assistant
        .generate_contract(&draft)
        .await
        .map_err(|e| port_error("Error generating contract", e))?;
    info!("Generated contract draft ({} chars)", content.chars().count());

    Ok(Json(GenerateContractResponse {
        content,
        message: "Contract generated successfully".to_string(),
    }))
}

/// Run an AI risk analysis on an owned contract.
#[utoipa::path(
    get,
    path = "/contracts/analyze/{contract_id}",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("contract_id" = Uuid, Path, description = "Contract id")),
    responses(
        (status = 200, description = "Risk report", body = AnalysisResponse),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Contract not found", body = ErrorResponse),
        (status = 500, description = "The AI delegate failed", body = ErrorResponse)
    )
)]
pub async fn analyze_contract_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    contract_id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Path(contract_id) = contract_id.map_err(|r| path_rejection("Contract", r))?;
    let (contract, analysis) = state
        .contracts
        .analyze(contract_id, user_id)
        .await
        .map_err(|e| port_error("Error analyzing contract with AI", e))?;

    Ok(Json(AnalysisResponse {
        success: true,
        contract_id: contract.id,
        contract_title: contract.title,
        analysis,
    }))
}

/// Render an owned contract to PDF and return the file.
#[utoipa::path(
    get,
    path = "/contracts/export/{id}/pdf",
    tag = "Contracts",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Contract id")),
    responses(
        (status = 200, description = "The contract as an `application/pdf` attachment"),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "Contract not found", body = ErrorResponse),
        (status = 500, description = "Rendering failed", body = ErrorResponse)
    )
)]
pub async fn export_contract_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let Path(id) = id.map_err(|r| path_rejection("Contract", r))?;
    let context = "Error exporting contract to PDF";
    let contract = state
        .contracts
        .find_by_id(id, user_id)
        .await
        .map_err(|e| port_error(context, e))?;
    let path = state
        .exporter
        .export_contract(&contract)
        .await
        .map_err(|e| port_error(context, e))?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        port_error(
            context,
            PortError::Unexpected(format!("cannot read {}: {e}", path.display())),
        )
    })?;

    let disposition = format!("attachment; filename=\"contract_{}.pdf\"", contract.id);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}
