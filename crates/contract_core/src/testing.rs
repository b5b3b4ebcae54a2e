//! crates/contract_core/src/testing.rs
//!
//! In-memory implementations of the ports for tests. Compiled for this
//! crate's own tests and, through the `test-support` feature, for the
//! service crate's integration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    AiConsultation, Contract, ContractInput, ContractStatus, Document, FieldError, NewContract,
    NewDocument, Notification, Plan, PlanFeatures, Quota, UsageCounts, User, UserCredentials,
};
use crate::ports::{
    AiDelegate, CompletionRequest, DatabaseService, DocumentStorage, PortError, PortResult,
    TextExtractionService,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A fully valid creation payload.
pub fn sample_contract_input() -> ContractInput {
    ContractInput {
        title: Some("Service Agreement".to_string()),
        content: Some("This Agreement is made between ABC Corporation and XYZ Inc.".to_string()),
        contract_type: Some("SERVICE".to_string()),
        party_1_name: Some("ABC Corporation".to_string()),
        party_1_role: Some("Service Provider".to_string()),
        party_2_name: Some("XYZ Inc.".to_string()),
        party_2_role: Some("Client".to_string()),
        contract_purpose: Some("Professional consulting services".to_string()),
        scope_of_work: Some("Design and delivery of a web application".to_string()),
        contract_duration: Some("12 months".to_string()),
        payment_type: Some("FIXED".to_string()),
        payment_amount: Some("10000".to_string()),
        payment_schedule: Some("MONTHLY".to_string()),
        ..Default::default()
    }
}

//=========================================================================================
// Database
//=========================================================================================

#[derive(Default)]
struct Tables {
    users: Vec<(User, String)>,
    plans: Vec<Plan>,
    contracts: Vec<Contract>,
    documents: Vec<Document>,
    consultations: Vec<AiConsultation>,
    notifications: Vec<Notification>,
}

/// A `DatabaseService` backed by vectors, seeded with the standard plans.
pub struct InMemoryDatabase {
    tables: Mutex<Tables>,
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        let plan = |name: &str, price: f64, limits: [i64; 3], priority: bool, custom: bool| Plan {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
            features: PlanFeatures {
                max_documents: Quota::from_raw(limits[0]),
                max_ai_consultations: Quota::from_raw(limits[1]),
                max_contracts: Quota::from_raw(limits[2]),
                priority,
                custom_support: custom,
            },
        };
        let tables = Tables {
            plans: vec![
                plan("Free", 0.0, [5, 10, 2], false, false),
                plan("Professional", 29.99, [50, 100, 20], true, false),
                plan("Enterprise", 99.99, [-1, -1, -1], true, true),
            ],
            ..Default::default()
        };
        Self {
            tables: Mutex::new(tables),
        }
    }

    pub fn contract_count(&self) -> usize {
        lock(&self.tables).contracts.len()
    }

    pub fn document_count(&self) -> usize {
        lock(&self.tables).documents.len()
    }
}

fn newest_first<T>(rows: impl Iterator<Item = T>) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.reverse();
    rows
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        plan_id: Uuid,
    ) -> PortResult<User> {
        let mut tables = lock(&self.tables);
        if tables.users.iter().any(|(u, _)| u.email == email) {
            return Err(PortError::Validation(vec![FieldError::new(
                "email",
                "Email already registered",
            )]));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            plan_id,
            created_at: Utc::now(),
        };
        tables.users.push((user.clone(), password_hash.to_string()));
        Ok(user)
    }

    async fn get_user_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        lock(&self.tables)
            .users
            .iter()
            .find(|(u, _)| u.email == email)
            .map(|(u, hash)| UserCredentials {
                user_id: u.id,
                email: u.email.clone(),
                password_hash: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {email} not found")))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        lock(&self.tables)
            .users
            .iter()
            .find(|(u, _)| u.id == user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {user_id} not found")))
    }

    async fn get_plan_by_id(&self, plan_id: Uuid) -> PortResult<Plan> {
        lock(&self.tables)
            .plans
            .iter()
            .find(|p| p.id == plan_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Plan {plan_id} not found")))
    }

    async fn get_plan_by_name(&self, name: &str) -> PortResult<Plan> {
        lock(&self.tables)
            .plans
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Plan {name} not found")))
    }

    async fn get_usage_for_user(&self, user_id: Uuid) -> PortResult<UsageCounts> {
        let tables = lock(&self.tables);
        let count = |n: usize| n as u64;
        Ok(UsageCounts {
            contracts: count(tables.contracts.iter().filter(|c| c.user_id == user_id).count()),
            documents: count(tables.documents.iter().filter(|d| d.user_id == user_id).count()),
            consultations: count(
                tables.consultations.iter().filter(|c| c.user_id == user_id).count(),
            ),
        })
    }

    async fn get_contract_by_id(&self, contract_id: Uuid) -> PortResult<Contract> {
        lock(&self.tables)
            .contracts
            .iter()
            .find(|c| c.id == contract_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Contract {contract_id} not found")))
    }

    async fn list_contracts_by_user(&self, user_id: Uuid) -> PortResult<Vec<Contract>> {
        let tables = lock(&self.tables);
        Ok(newest_first(
            tables.contracts.iter().filter(|c| c.user_id == user_id).cloned(),
        ))
    }

    async fn insert_contract(&self, user_id: Uuid, c: NewContract) -> PortResult<Contract> {
        let now = Utc::now();
        let contract = Contract {
            id: Uuid::new_v4(),
            user_id,
            title: c.title,
            content: c.content,
            contract_type: c.contract_type,
            party_1_name: c.party_1_name,
            party_1_role: c.party_1_role,
            party_1_address: c.party_1_address,
            party_2_name: c.party_2_name,
            party_2_role: c.party_2_role,
            party_2_address: c.party_2_address,
            contract_purpose: c.contract_purpose,
            scope_of_work: c.scope_of_work,
            contract_duration: c.contract_duration,
            start_date: c.start_date,
            end_date: c.end_date,
            auto_renewal: c.auto_renewal,
            payment_type: c.payment_type,
            payment_amount: c.payment_amount,
            currency: c.currency,
            payment_schedule: c.payment_schedule,
            confidentiality_clause: c.confidentiality_clause,
            non_compete_clause: c.non_compete_clause,
            termination_conditions: c.termination_conditions,
            status: ContractStatus::Draft,
            signed: false,
            signed_at: None,
            expires_at: None,
            metadata: c.metadata,
            created_at: now,
            updated_at: now,
        };
        lock(&self.tables).contracts.push(contract.clone());
        Ok(contract)
    }

    async fn update_contract(&self, contract: &Contract) -> PortResult<Contract> {
        let mut tables = lock(&self.tables);
        let slot = tables
            .contracts
            .iter_mut()
            .find(|c| c.id == contract.id)
            .ok_or_else(|| PortError::NotFound(format!("Contract {} not found", contract.id)))?;
        *slot = contract.clone();
        Ok(contract.clone())
    }

    async fn delete_contract(&self, contract_id: Uuid) -> PortResult<()> {
        lock(&self.tables).contracts.retain(|c| c.id != contract_id);
        Ok(())
    }

    async fn create_document(&self, user_id: Uuid, d: NewDocument) -> PortResult<Document> {
        let document = Document {
            id: Uuid::new_v4(),
            user_id,
            title: d.title,
            file_name: d.file_name,
            file_type: d.file_type,
            file_size: d.file_size,
            file_path: d.file_path,
            content: d.content,
            metadata: d.metadata,
            analyzed: d.analyzed,
            created_at: Utc::now(),
        };
        lock(&self.tables).documents.push(document.clone());
        Ok(document)
    }

    async fn list_documents_by_user(&self, user_id: Uuid) -> PortResult<Vec<Document>> {
        let tables = lock(&self.tables);
        Ok(newest_first(
            tables.documents.iter().filter(|d| d.user_id == user_id).cloned(),
        ))
    }

    async fn save_consultation(
        &self,
        user_id: Uuid,
        query: &str,
        response: &str,
    ) -> PortResult<AiConsultation> {
        let consultation = AiConsultation {
            id: Uuid::new_v4(),
            user_id,
            query: query.to_string(),
            response: response.to_string(),
            created_at: Utc::now(),
        };
        lock(&self.tables).consultations.push(consultation.clone());
        Ok(consultation)
    }

    async fn list_consultations_by_user(&self, user_id: Uuid) -> PortResult<Vec<AiConsultation>> {
        let tables = lock(&self.tables);
        Ok(newest_first(
            tables.consultations.iter().filter(|c| c.user_id == user_id).cloned(),
        ))
    }

    async fn create_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        message: &str,
    ) -> PortResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            kind: kind.to_string(),
            message: message.to_string(),
            seen: false,
            created_at: Utc::now(),
        };
        lock(&self.tables).notifications.push(notification.clone());
        Ok(notification)
    }

    async fn list_notifications_by_user(&self, user_id: Uuid) -> PortResult<Vec<Notification>> {
        let tables = lock(&self.tables);
        Ok(newest_first(
            tables.notifications.iter().filter(|n| n.user_id == user_id).cloned(),
        ))
    }

    async fn get_notification_by_id(&self, notification_id: Uuid) -> PortResult<Notification> {
        lock(&self.tables)
            .notifications
            .iter()
            .find(|n| n.id == notification_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Notification {notification_id} not found")))
    }

    async fn mark_notification_seen(&self, notification_id: Uuid) -> PortResult<Notification> {
        let mut tables = lock(&self.tables);
        let slot = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or_else(|| PortError::NotFound(format!("Notification {notification_id} not found")))?;
        slot.seen = true;
        Ok(slot.clone())
    }
}

//=========================================================================================
// AI Delegate
//=========================================================================================

/// Replies with a fixed text (or error) and records every request.
pub struct ScriptedDelegate {
    reply: Result<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl ScriptedDelegate {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::replying("")
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        lock(&self.last_request).clone()
    }
}

#[async_trait]
impl AiDelegate for ScriptedDelegate {
    async fn complete(&self, request: &CompletionRequest) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_request) = Some(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone().map_err(PortError::Unexpected)
    }

    fn method_tag(&self) -> &'static str {
        "scripted"
    }
}

//=========================================================================================
// Files
//=========================================================================================

/// Keeps stored uploads in memory, keyed by stored name.
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn stored(&self) -> Vec<String> {
        lock(&self.files).keys().cloned().collect()
    }
}

#[async_trait]
impl DocumentStorage for MemoryStorage {
    async fn store(&self, stored_name: &str, data: &[u8]) -> PortResult<String> {
        lock(&self.files).insert(stored_name.to_string(), data.to_vec());
        Ok(format!("memory/{stored_name}"))
    }

    async fn remove(&self, stored_path: &str) -> PortResult<()> {
        let name = stored_path.trim_start_matches("memory/");
        lock(&self.files).remove(name);
        Ok(())
    }
}

/// Returns a fixed text for every file, or always fails.
pub struct StaticExtractor {
    text: Option<String>,
}

impl StaticExtractor {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl TextExtractionService for StaticExtractor {
    async fn extract_text(&self, file_name: &str, _data: &[u8]) -> PortResult<String> {
        self.text
            .clone()
            .ok_or_else(|| PortError::Unexpected(format!("cannot read {file_name}")))
    }
}
