//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use contract_core::domain::{
    AiConsultation, Contract, ContractStatus, Document, FieldError, NewContract, NewDocument,
    Notification, Plan, PlanFeatures, Quota, UsageCounts, User, UserCredentials,
};
use contract_core::ports::{DatabaseService, PortError, PortResult};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{what} not found")),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    plan_id: Uuid,
    created_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            plan_id: self.plan_id,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    password_hash: String,
}

#[derive(FromRow)]
struct PlanRecord {
    id: Uuid,
    name: String,
    price: f64,
    max_documents: i64,
    max_ai_consultations: i64,
    max_contracts: i64,
    priority: bool,
    custom_support: bool,
}
impl PlanRecord {
    fn to_domain(self) -> Plan {
        Plan {
            id: self.id,
            name: self.name,
            price: self.price,
            features: PlanFeatures {
                max_documents: Quota::from_raw(self.max_documents),
                max_ai_consultations: Quota::from_raw(self.max_ai_consultations),
                max_contracts: Quota::from_raw(self.max_contracts),
                priority: self.priority,
                custom_support: self.custom_support,
            },
        }
    }
}

#[derive(FromRow)]
struct UsageRecord {
    contracts: i64,
    documents: i64,
    consultations: i64,
}

#[derive(FromRow)]
struct ContractRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: String,
    contract_type: String,
    party_1_name: String,
    party_1_role: String,
    party_1_address: Option<String>,
    party_2_name: String,
    party_2_role: String,
    party_2_address: Option<String>,
    contract_purpose: String,
    scope_of_work: String,
    contract_duration: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    auto_renewal: bool,
    payment_type: String,
    payment_amount: String,
    currency: Option<String>,
    payment_schedule: String,
    confidentiality_clause: bool,
    non_compete_clause: bool,
    termination_conditions: Option<String>,
    status: String,
    signed: bool,
    signed_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    metadata: Option<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ContractRecord {
    fn to_domain(self) -> PortResult<Contract> {
        let status = self
            .status
            .parse::<ContractStatus>()
            .map_err(PortError::Unexpected)?;
        Ok(Contract {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            content: self.content,
            contract_type: self.contract_type,
            party_1_name: self.party_1_name,
            party_1_role: self.party_1_role,
            party_1_address: self.party_1_address,
            party_2_name: self.party_2_name,
            party_2_role: self.party_2_role,
            party_2_address: self.party_2_address,
            contract_purpose: self.contract_purpose,
            scope_of_work: self.scope_of_work,
            contract_duration: self.contract_duration,
            start_date: self.start_date,
            end_date: self.end_date,
            auto_renewal: self.auto_renewal,
            payment_type: self.payment_type,
            payment_amount: self.payment_amount,
            currency: self.currency,
            payment_schedule: self.payment_schedule,
            confidentiality_clause: self.confidentiality_clause,
            non_compete_clause: self.non_compete_clause,
            termination_conditions: self.termination_conditions,
            status,
            signed: self.signed,
            signed_at: self.signed_at,
            expires_at: self.expires_at,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    file_name: String,
    file_type: String,
    file_size: i64,
    file_path: String,
    content: String,
    metadata: Value,
    analyzed: bool,
    created_at: DateTime<Utc>,
}
impl DocumentRecord {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            file_name: self.file_name,
            file_type: self.file_type,
            file_size: u64::try_from(self.file_size).unwrap_or_default(),
            file_path: self.file_path,
            content: self.content,
            metadata: self.metadata,
            analyzed: self.analyzed,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ConsultationRecord {
    id: Uuid,
    user_id: Uuid,
    query: String,
    response: String,
    created_at: DateTime<Utc>,
}
impl ConsultationRecord {
    fn to_domain(self) -> AiConsultation {
        AiConsultation {
            id: self.id,
            user_id: self.user_id,
            query: self.query,
            response: self.response,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct NotificationRecord {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    message: String,
    seen: bool,
    created_at: DateTime<Utc>,
}
impl NotificationRecord {
    fn to_domain(self) -> Notification {
        Notification {
            id: self.id,
            user_id: self.user_id,
            kind: self.kind,
            message: self.message,
            seen: self.seen,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// Column Lists
//=========================================================================================

const USER_COLUMNS: &str = "id, name, email, plan_id, created_at";

const PLAN_COLUMNS: &str = "id, name, price, max_documents, max_ai_consultations, \
     max_contracts, priority, custom_support";

// NUMERIC is read back as text so amounts round-trip without a decimal crate.
const CONTRACT_COLUMNS: &str = "id, user_id, title, content, contract_type, \
     party_1_name, party_1_role, party_1_address, party_2_name, party_2_role, party_2_address, \
     contract_purpose, scope_of_work, contract_duration, start_date, end_date, auto_renewal, \
     payment_type, payment_amount::TEXT AS payment_amount, currency, payment_schedule, \
     confidentiality_clause, non_compete_clause, termination_conditions, status, signed, \
     signed_at, expires_at, metadata, created_at, updated_at";

const DOCUMENT_COLUMNS: &str = "id, user_id, title, file_name, file_type, file_size, \
     file_path, content, metadata, analyzed, created_at";

const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, message, seen, created_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        plan_id: Uuid,
    ) -> PortResult<User> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, plan_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .bind(plan_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    PortError::Validation(vec![FieldError::new(
                        "email",
                        "Email already registered",
                    )])
                }
                other => unexpected(other),
            })?;
        Ok(record.to_domain())
    }

    async fn get_user_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("User {email}")))?;

        Ok(UserCredentials {
            user_id: record.id,
            email: record.email,
            password_hash: record.password_hash,
        })
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("User {user_id}")))?;
        Ok(record.to_domain())
    }

    async fn get_plan_by_id(&self, plan_id: Uuid) -> PortResult<Plan> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1");
        let record = sqlx::query_as::<_, PlanRecord>(&sql)
            .bind(plan_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Plan {plan_id}")))?;
        Ok(record.to_domain())
    }

    async fn get_plan_by_name(&self, name: &str) -> PortResult<Plan> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM plans WHERE name = $1");
        let record = sqlx::query_as::<_, PlanRecord>(&sql)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Plan {name}")))?;
        Ok(record.to_domain())
    }

    async fn get_usage_for_user(&self, user_id: Uuid) -> PortResult<UsageCounts> {
        let record = sqlx::query_as::<_, UsageRecord>(
            "SELECT \
                (SELECT COUNT(*) FROM contracts WHERE user_id = $1) AS contracts, \
                (SELECT COUNT(*) FROM documents WHERE user_id = $1) AS documents, \
                (SELECT COUNT(*) FROM ai_consultations WHERE user_id = $1) AS consultations",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let count = |n: i64| u64::try_from(n).unwrap_or_default();
        Ok(UsageCounts {
            contracts: count(record.contracts),
            documents: count(record.documents),
            consultations: count(record.consultations),
        })
    }

    async fn get_contract_by_id(&self, contract_id: Uuid) -> PortResult<Contract> {
        let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1");
        sqlx::query_as::<_, ContractRecord>(&sql)
            .bind(contract_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Contract {contract_id}")))?
            .to_domain()
    }

    async fn list_contracts_by_user(&self, user_id: Uuid) -> PortResult<Vec<Contract>> {
        let sql = format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, ContractRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn insert_contract(&self, user_id: Uuid, c: NewContract) -> PortResult<Contract> {
        let sql = format!(
            "INSERT INTO contracts (id, user_id, title, content, contract_type, \
                party_1_name, party_1_role, party_1_address, party_2_name, party_2_role, \
                party_2_address, contract_purpose, scope_of_work, contract_duration, \
                start_date, end_date, auto_renewal, payment_type, payment_amount, currency, \
                payment_schedule, confidentiality_clause, non_compete_clause, \
                termination_conditions, status, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                $17, $18, $19::NUMERIC, $20, $21, $22, $23, $24, $25, $26) \
             RETURNING {CONTRACT_COLUMNS}"
        );
        sqlx::query_as::<_, ContractRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(c.title)
            .bind(c.content)
            .bind(c.contract_type)
            .bind(c.party_1_name)
            .bind(c.party_1_role)
            .bind(c.party_1_address)
            .bind(c.party_2_name)
            .bind(c.party_2_role)
            .bind(c.party_2_address)
            .bind(c.contract_purpose)
            .bind(c.scope_of_work)
            .bind(c.contract_duration)
            .bind(c.start_date)
            .bind(c.end_date)
            .bind(c.auto_renewal)
            .bind(c.payment_type)
            .bind(c.payment_amount.trim().to_string())
            .bind(c.currency)
            .bind(c.payment_schedule)
            .bind(c.confidentiality_clause)
            .bind(c.non_compete_clause)
            .bind(c.termination_conditions)
            .bind(ContractStatus::Draft.as_str())
            .bind(c.metadata)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?
            .to_domain()
    }

    async fn update_contract(&self, c: &Contract) -> PortResult<Contract> {
        let sql = format!(
            "UPDATE contracts SET title = $2, content = $3, contract_type = $4, \
                party_1_name = $5, party_1_role = $6, party_1_address = $7, \
                party_2_name = $8, party_2_role = $9, party_2_address = $10, \
                contract_purpose = $11, scope_of_work = $12, contract_duration = $13, \
                start_date = $14, end_date = $15, auto_renewal = $16, payment_type = $17, \
                payment_amount = $18::NUMERIC, currency = $19, payment_schedule = $20, \
                confidentiality_clause = $21, non_compete_clause = $22, \
                termination_conditions = $23, status = $24, signed = $25, signed_at = $26, \
                expires_at = $27, metadata = $28, updated_at = $29 \
             WHERE id = $1 RETURNING {CONTRACT_COLUMNS}"
        );
        sqlx::query_as::<_, ContractRecord>(&sql)
            .bind(c.id)
            .bind(&c.title)
            .bind(&c.content)
            .bind(&c.contract_type)
            .bind(&c.party_1_name)
            .bind(&c.party_1_role)
            .bind(&c.party_1_address)
            .bind(&c.party_2_name)
            .bind(&c.party_2_role)
            .bind(&c.party_2_address)
            .bind(&c.contract_purpose)
            .bind(&c.scope_of_work)
            .bind(&c.contract_duration)
            .bind(c.start_date)
            .bind(c.end_date)
            .bind(c.auto_renewal)
            .bind(&c.payment_type)
            .bind(c.payment_amount.trim())
            .bind(&c.currency)
            .bind(&c.payment_schedule)
            .bind(c.confidentiality_clause)
            .bind(c.non_compete_clause)
            .bind(&c.termination_conditions)
            .bind(c.status.as_str())
            .bind(c.signed)
            .bind(c.signed_at)
            .bind(c.expires_at)
            .bind(&c.metadata)
            .bind(c.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Contract {}", c.id)))?
            .to_domain()
    }

    async fn delete_contract(&self, contract_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM contracts WHERE id = $1")
            .bind(contract_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_document(&self, user_id: Uuid, d: NewDocument) -> PortResult<Document> {
        let sql = format!(
            "INSERT INTO documents (id, user_id, title, file_name, file_type, file_size, \
                file_path, content, metadata, analyzed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {DOCUMENT_COLUMNS}"
        );
        let file_size = i64::try_from(d.file_size)
            .map_err(|_| PortError::Unexpected(format!("file size {} too large", d.file_size)))?;
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(d.title)
            .bind(d.file_name)
            .bind(d.file_type)
            .bind(file_size)
            .bind(d.file_path)
            .bind(d.content)
            .bind(d.metadata)
            .bind(d.analyzed)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_documents_by_user(&self, user_id: Uuid) -> PortResult<Vec<Document>> {
        let sql = format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn save_consultation(
        &self,
        user_id: Uuid,
        query: &str,
        response: &str,
    ) -> PortResult<AiConsultation> {
        let record = sqlx::query_as::<_, ConsultationRecord>(
            "INSERT INTO ai_consultations (id, user_id, query, response) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, query, response, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(query)
        .bind(response)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_consultations_by_user(&self, user_id: Uuid) -> PortResult<Vec<AiConsultation>> {
        let records = sqlx::query_as::<_, ConsultationRecord>(
            "SELECT id, user_id, query, response, created_at FROM ai_consultations \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn create_notification(
        &self,
        user_id: Uuid,
        kind: &str,
        message: &str,
    ) -> PortResult<Notification> {
        let sql = format!(
            "INSERT INTO notifications (id, user_id, kind, message) VALUES ($1, $2, $3, $4) \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        let record = sqlx::query_as::<_, NotificationRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(kind)
            .bind(message)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn list_notifications_by_user(&self, user_id: Uuid) -> PortResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC"
        );
        let records = sqlx::query_as::<_, NotificationRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_notification_by_id(&self, notification_id: Uuid) -> PortResult<Notification> {
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1");
        let record = sqlx::query_as::<_, NotificationRecord>(&sql)
            .bind(notification_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Notification {notification_id}")))?;
        Ok(record.to_domain())
    }

    async fn mark_notification_seen(&self, notification_id: Uuid) -> PortResult<Notification> {
        let sql = format!(
            "UPDATE notifications SET seen = TRUE WHERE id = $1 RETURNING {NOTIFICATION_COLUMNS}"
        );
        let record = sqlx::query_as::<_, NotificationRecord>(&sql)
            .bind(notification_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Notification {notification_id}")))?;
        Ok(record.to_domain())
    }
}
