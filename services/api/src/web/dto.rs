//! services/api/src/web/dto.rs
//!
//! Request and response payloads for the REST API, with conversions to and
//! from the core domain types. Contract, document and extraction fields use
//! snake_case; the analysis envelope uses camelCase.

use chrono::{DateTime, NaiveDate, Utc};
use contract_core::contracts::is_numeric;
use contract_core::domain::{
    AiConsultation, Contract, ContractDraftRequest, ContractInput, ContractPatch, ContractStatus,
    Document, ExtractedContract, FieldError, Notification, Plan, Quota, RiskReport, UsageCounts,
    User,
};
use contract_core::serde_ext::optional_lenient_string;
use contract_core::UploadOutcome;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Field Deserializers
//=========================================================================================

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its date part is
/// kept). Empty strings and `null` mean "not supplied".
fn optional_iso_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else { return Ok(None) };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("'{trimmed}' is not a valid ISO-8601 date")))
}

//=========================================================================================
// Contracts
//=========================================================================================

/// Body of `POST /contracts` and `PUT /contracts/{id}`. Every field is
/// optional at this level; creation enforces the required set.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ContractRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub contract_type: Option<String>,
    pub party_1_name: Option<String>,
    pub party_1_role: Option<String>,
    pub party_1_address: Option<String>,
    pub party_2_name: Option<String>,
    pub party_2_role: Option<String>,
    pub party_2_address: Option<String>,
    pub contract_purpose: Option<String>,
    pub scope_of_work: Option<String>,
    pub contract_duration: Option<String>,
    #[serde(default, deserialize_with = "optional_iso_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "optional_iso_date")]
    pub end_date: Option<NaiveDate>,
    pub auto_renewal: Option<bool>,
    pub payment_type: Option<String>,
    /// A number or a numeric string.
    #[serde(default, deserialize_with = "optional_lenient_string")]
    #[schema(value_type = Option<String>, example = "10000")]
    pub payment_amount: Option<String>,
    pub currency: Option<String>,
    pub payment_schedule: Option<String>,
    pub confidentiality_clause: Option<bool>,
    pub non_compete_clause: Option<bool>,
    pub termination_conditions: Option<String>,
    /// Update only.
    pub status: Option<String>,
    /// Update only.
    pub signed: Option<bool>,
    /// Update only.
    #[serde(alias = "signedAt")]
    pub signed_at: Option<DateTime<Utc>>,
    /// Update only.
    #[serde(alias = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl ContractRequest {
    pub fn into_input(self) -> ContractInput {
        ContractInput {
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
            metadata: self.metadata,
        }
    }

    /// Fails only on an unknown `status`; other checks run in the core.
    pub fn into_patch(self) -> Result<ContractPatch, Vec<FieldError>> {
        let status = match self.status.as_deref() {
            None => None,
            Some(raw) => Some(raw.parse::<ContractStatus>().map_err(|_| {
                vec![FieldError::new(
                    "status",
                    "Status must be one of DRAFT, REVIEW, ACTIVE, SIGNED, EXPIRED, TERMINATED",
                )]
            })?),
        };
        Ok(ContractPatch {
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
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContractResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub contract_type: String,
    pub party_1_name: String,
    pub party_1_role: String,
    pub party_1_address: Option<String>,
    pub party_2_name: String,
    pub party_2_role: String,
    pub party_2_address: Option<String>,
    pub contract_purpose: String,
    pub scope_of_work: String,
    pub contract_duration: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub auto_renewal: bool,
    pub payment_type: String,
    pub payment_amount: String,
    pub currency: Option<String>,
    pub payment_schedule: String,
    pub confidentiality_clause: bool,
    pub non_compete_clause: bool,
    pub termination_conditions: Option<String>,
    pub status: String,
    pub signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Contract> for ContractResponse {
    fn from(c: Contract) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
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
            status: c.status.to_string(),
            signed: c.signed,
            signed_at: c.signed_at,
            expires_at: c.expires_at,
            metadata: c.metadata,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

//=========================================================================================
// Generation and Analysis
//=========================================================================================

/// Body of `POST /contracts/generate`. Missing fields get defaults.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GenerateContractRequest {
    pub title: Option<String>,
    pub contract_type: Option<String>,
    pub party_1_name: Option<String>,
    pub party_1_role: Option<String>,
    pub party_1_address: Option<String>,
    pub party_2_name: Option<String>,
    pub party_2_role: Option<String>,
    pub party_2_address: Option<String>,
    pub contract_purpose: Option<String>,
    pub scope_of_work: Option<String>,
    pub contract_duration: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub auto_renewal: Option<bool>,
    pub payment_type: Option<String>,
    #[serde(default, deserialize_with = "optional_lenient_string")]
    #[schema(value_type = Option<String>, example = "5000")]
    pub payment_amount: Option<String>,
    pub currency: Option<String>,
    pub payment_schedule: Option<String>,
    pub confidentiality_clause: Option<bool>,
    pub non_compete_clause: Option<bool>,
    pub termination_conditions: Option<String>,
}

impl GenerateContractRequest {
    pub fn into_draft(self) -> Result<ContractDraftRequest, Vec<FieldError>> {
        if self
            .payment_amount
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty() && !is_numeric(a))
        {
            return Err(vec![FieldError::new(
                "payment_amount",
                "Payment amount must be a number",
            )]);
        }
        Ok(ContractDraftRequest {
            title: self.title,
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
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateContractResponse {
    pub content: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub success: bool,
    pub contract_id: Uuid,
    pub contract_title: String,
    /// `overallRiskAssessment`, `identifiedRisks`, `missingClauses`,
    /// `ambiguousTerms`, `recommendedImprovements`.
    #[schema(value_type = Object)]
    pub analysis: RiskReport,
}

//=========================================================================================
// Documents and Uploads
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub file_path: String,
    pub content: String,
    #[schema(value_type = Object)]
    pub metadata: Value,
    pub analyzed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            user_id: d.user_id,
            title: d.title,
            file_name: d.file_name,
            file_type: d.file_type,
            file_size: d.file_size,
            file_path: d.file_path,
            content: d.content,
            metadata: d.metadata,
            analyzed: d.analyzed,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExtractedPartyBody {
    pub name: String,
    pub role: String,
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExtractedDurationBody {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ExtractedPaymentBody {
    pub payment_type: String,
    pub amount: String,
    pub currency: String,
    pub payment_schedule: String,
}

/// The extracted contract fields plus the stored document.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub title: String,
    pub contract_type: String,
    pub content: String,
    pub parties: Vec<ExtractedPartyBody>,
    pub contract_purpose: String,
    pub scope_of_work: String,
    pub duration: ExtractedDurationBody,
    pub payment: ExtractedPaymentBody,
    pub confidentiality_clause: bool,
    pub non_compete_clause: bool,
    pub termination_conditions: String,
    pub document: DocumentResponse,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        let ExtractedContract {
            title,
            contract_type,
            content,
            parties,
            contract_purpose,
            scope_of_work,
            duration,
            payment,
            confidentiality_clause,
            non_compete_clause,
            termination_conditions,
        } = outcome.extracted;
        Self {
            title,
            contract_type,
            content,
            parties: parties
                .into_iter()
                .map(|p| ExtractedPartyBody {
                    name: p.name,
                    role: p.role,
                    address: p.address,
                })
                .collect(),
            contract_purpose,
            scope_of_work,
            duration: ExtractedDurationBody {
                start_date: duration.start_date,
                end_date: duration.end_date,
            },
            payment: ExtractedPaymentBody {
                payment_type: payment.payment_type,
                amount: payment.amount,
                currency: payment.currency,
                payment_schedule: payment.payment_schedule,
            },
            confidentiality_clause,
            non_compete_clause,
            termination_conditions,
            document: outcome.document.into(),
        }
    }
}

//=========================================================================================
// Consultations and Notifications
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct ConsultationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

impl From<AiConsultation> for ConsultationResponse {
    fn from(c: AiConsultation) -> Self {
        Self {
            id: c.id,
            user_id: c.user_id,
            query: c.query,
            response: c.response,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            kind: n.kind,
            message: n.message,
            seen: n.seen,
            created_at: n.created_at,
        }
    }
}

//=========================================================================================
// Accounts
//=========================================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "Name is required"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            errors.push(FieldError::new("email", "A valid email is required"));
        }
        if self.password.chars().count() < 6 {
            errors.push(FieldError::new(
                "password",
                "Password must be at least 6 characters",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub plan_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            plan_id: u.plan_id,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// One quota line: the limit (`null` when unlimited), current use, and
/// what is left (`null` when unlimited).
#[derive(Debug, Serialize, ToSchema)]
pub struct QuotaUsage {
    pub limit: Option<u32>,
    pub used: u64,
    pub remaining: Option<u64>,
}

impl QuotaUsage {
    fn new(quota: Quota, used: u64) -> Self {
        let limit = match quota {
            Quota::Unlimited => None,
            Quota::Limited(n) => Some(n),
        };
        Self {
            limit,
            used,
            remaining: quota.remaining(used),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlanResponse {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub priority: bool,
    pub custom_support: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountUsage {
    pub contracts: QuotaUsage,
    pub documents: QuotaUsage,
    pub ai_consultations: QuotaUsage,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    pub user: UserResponse,
    pub plan: PlanResponse,
    pub usage: AccountUsage,
}

impl AccountResponse {
    pub fn new(user: User, plan: Plan, usage: UsageCounts) -> Self {
        let Plan {
            id,
            name,
            price,
            features,
        } = plan;
        Self {
            user: user.into(),
            plan: PlanResponse {
                id,
                name,
                price,
                priority: features.priority,
                custom_support: features.custom_support,
            },
            usage: AccountUsage {
                contracts: QuotaUsage::new(features.max_contracts, usage.contracts),
                documents: QuotaUsage::new(features.max_documents, usage.documents),
                ai_consultations: QuotaUsage::new(
                    features.max_ai_consultations,
                    usage.consultations,
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_request_accepts_numeric_amounts_and_timestamps() {
        let raw = r#"{
            "title": "NDA",
            "payment_amount": 1500.5,
            "start_date": "2025-03-01T00:00:00.000Z",
            "end_date": "",
            "signedAt": "2025-03-02T10:00:00Z"
        }"#;
        let req: ContractRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.payment_amount.as_deref(), Some("1500.5"));
        assert_eq!(req.start_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(req.end_date, None);
        assert!(req.signed_at.is_some());
    }

    #[test]
    fn bad_dates_are_rejected_at_parse_time() {
        let result = serde_json::from_str::<ContractRequest>(r#"{"start_date": "next week"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_status_is_a_field_error() {
        let req = ContractRequest {
            status: Some("archived".to_string()),
            ..Default::default()
        };
        let errors = req.into_patch().unwrap_err();
        assert_eq!(errors[0].field, "status");

        let req = ContractRequest {
            status: Some("signed".to_string()),
            ..Default::default()
        };
        assert_eq!(req.into_patch().unwrap().status, Some(ContractStatus::Signed));
    }

    #[test]
    fn unlimited_quotas_report_no_limit() {
        let usage = QuotaUsage::new(Quota::Unlimited, 42);
        assert_eq!(usage.limit, None);
        assert_eq!(usage.remaining, None);

        let usage = QuotaUsage::new(Quota::Limited(2), 1);
        assert_eq!(usage.remaining, Some(1));
    }
}
