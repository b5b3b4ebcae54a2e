//! crates/contract_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases,
//! the hosted language model, or the filesystem.

use std::path::PathBuf;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    AiConsultation, Contract, Document, FieldError, NewContract, NewDocument, Notification, Plan,
    UsageCounts, User, UserCredentials,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The entity does not exist, or it exists but belongs to someone else.
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),
    #[error("Unauthorized")]
    Unauthorized,
    /// The hosted model failed, timed out, or returned something unusable.
    #[error("AI delegate error: {0}")]
    AiDelegate(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users & Plans ---
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        plan_id: Uuid,
    ) -> PortResult<User>;

    async fn get_user_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_plan_by_id(&self, plan_id: Uuid) -> PortResult<Plan>;

    async fn get_plan_by_name(&self, name: &str) -> PortResult<Plan>;

    async fn get_usage_for_user(&self, user_id: Uuid) -> PortResult<UsageCounts>;

    // --- Contracts ---
    async fn get_contract_by_id(&self, contract_id: Uuid) -> PortResult<Contract>;

    async fn list_contracts_by_user(&self, user_id: Uuid) -> PortResult<Vec<Contract>>;

    async fn insert_contract(&self, user_id: Uuid, contract: NewContract) -> PortResult<Contract>;

    /// Writes every mutable column of the contract back. Last write wins.
    async fn update_contract(&self, contract: &Contract) -> PortResult<Contract>;

    async fn delete_contract(&self, contract_id: Uuid) -> PortResult<()>;

    // --- Documents ---
    async fn create_document(&self, user_id: Uuid, document: NewDocument) -> PortResult<Document>;

    async fn list_documents_by_user(&self, user_id: Uuid) -> PortResult<Vec<Document>>;

    // --- AI Consultations ---
    async fn save_consultation(
        &self,
        user_id: Uuid,
        query: &str,
        response: &str,
    ) -> PortResult<AiConsultation>;

    async fn list_consultations_by_user(&self, user_id: Uuid) -> PortResult<Vec<AiConsultation>>;

    // --- Notifications ---
    async fn create_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        message: &str,
    ) -> PortResult<Notification>;

    async fn list_notifications_by_user(&self, user_id: Uuid) -> PortResult<Vec<Notification>>;

    async fn get_notification_by_id(&self, notification_id: Uuid) -> PortResult<Notification>;

    async fn mark_notification_seen(&self, notification_id: Uuid) -> PortResult<Notification>;
}

/// What a completion is for. Fixture delegates use it to pick a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPurpose {
    Draft,
    Extraction,
    RiskAnalysis,
}

/// A single prompt for the hosted language model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub purpose: CompletionPurpose,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Whether the reply must be a single JSON object.
    pub expects_json: bool,
}

#[async_trait]
pub trait AiDelegate: Send + Sync {
    /// Sends one prompt and returns the raw text of the first reply.
    async fn complete(&self, request: &CompletionRequest) -> PortResult<String>;

    /// Short tag recorded in document metadata (e.g. `openai`).
    fn method_tag(&self) -> &'static str;
}

/// Converts uploaded file bytes to plain text.
#[async_trait]
pub trait TextExtractionService: Send + Sync {
    async fn extract_text(&self, file_name: &str, data: &[u8]) -> PortResult<String>;
}

#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Persists the bytes under `stored_name` and returns the path written.
    async fn store(&self, stored_name: &str, data: &[u8]) -> PortResult<String>;

    /// Deletes a file previously returned by `store`.
    async fn remove(&self, stored_path: &str) -> PortResult<()>;
}

#[async_trait]
pub trait ContractExporter: Send + Sync {
    /// Renders the contract to a PDF on durable storage and returns its path.
    async fn export_contract(&self, contract: &Contract) -> PortResult<PathBuf>;
}
