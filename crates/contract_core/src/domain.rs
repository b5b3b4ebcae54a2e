//! crates/contract_core/src/domain.rs
//!
//! Defines the core data structures for the contract manager.
//! Persisted entities are independent of any database or wire format; the
//! AI result types carry serde derives because they are parsed from model
//! replies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::serde_ext::{
    lenient_bool, lenient_string, lenient_string_list, null_as_default, optional_lenient_string,
};

//=========================================================================================
// Users and Plans
//=========================================================================================

/// Represents a user account - used throughout app.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub plan_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
}

/// A resource limit attached to a plan.
///
/// Stored as a signed integer where `-1` means "no limit". The sentinel is
/// decoded here so it is never compared against a real count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Unlimited,
    Limited(u32),
}

impl Quota {
    pub fn from_raw(raw: i64) -> Self {
        if raw < 0 {
            Quota::Unlimited
        } else {
            Quota::Limited(u32::try_from(raw).unwrap_or(u32::MAX))
        }
    }

    pub fn to_raw(self) -> i64 {
        match self {
            Quota::Unlimited => -1,
            Quota::Limited(n) => i64::from(n),
        }
    }

    /// How many more units fit under the quota, `None` when unlimited.
    pub fn remaining(self, used: u64) -> Option<u64> {
        match self {
            Quota::Unlimited => None,
            Quota::Limited(n) => Some(u64::from(n).saturating_sub(used)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanFeatures {
    pub max_documents: Quota,
    pub max_ai_consultations: Quota,
    pub max_contracts: Quota,
    pub priority: bool,
    pub custom_support: bool,
}

/// Subscription tier. Reference data, never mutated by the application.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub features: PlanFeatures,
}

/// Name of the plan assigned to newly registered users.
pub const DEFAULT_PLAN_NAME: &str = "Free";

/// Per-user counts of owned resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounts {
    pub contracts: u64,
    pub documents: u64,
    pub consultations: u64,
}

//=========================================================================================
// Contracts
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContractStatus {
    #[default]
    Draft,
    Review,
    Active,
    Signed,
    Expired,
    Terminated,
}

impl ContractStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Draft => "DRAFT",
            ContractStatus::Review => "REVIEW",
            ContractStatus::Active => "ACTIVE",
            ContractStatus::Signed => "SIGNED",
            ContractStatus::Expired => "EXPIRED",
            ContractStatus::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(ContractStatus::Draft),
            "REVIEW" => Ok(ContractStatus::Review),
            "ACTIVE" => Ok(ContractStatus::Active),
            "SIGNED" => Ok(ContractStatus::Signed),
            "EXPIRED" => Ok(ContractStatus::Expired),
            "TERMINATED" => Ok(ContractStatus::Terminated),
            other => Err(format!("unknown contract status '{other}'")),
        }
    }
}

/// A persisted legal agreement owned by a single user.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
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
    /// Decimal amount kept as text so it round-trips exactly.
    pub payment_amount: String,
    pub currency: Option<String>,
    pub payment_schedule: String,
    pub confidentiality_clause: bool,
    pub non_compete_clause: bool,
    pub termination_conditions: Option<String>,
    pub status: ContractStatus,
    pub signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unvalidated fields for a new contract, as received from a caller.
#[derive(Debug, Clone, Default)]
pub struct ContractInput {
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
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub auto_renewal: Option<bool>,
    pub payment_type: Option<String>,
    pub payment_amount: Option<String>,
    pub currency: Option<String>,
    pub payment_schedule: Option<String>,
    pub confidentiality_clause: Option<bool>,
    pub non_compete_clause: Option<bool>,
    pub termination_conditions: Option<String>,
    pub metadata: Option<Value>,
}

/// A contract that passed creation checks and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContract {
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
    pub metadata: Option<Value>,
}

/// A partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ContractPatch {
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
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub auto_renewal: Option<bool>,
    pub payment_type: Option<String>,
    pub payment_amount: Option<String>,
    pub currency: Option<String>,
    pub payment_schedule: Option<String>,
    pub confidentiality_clause: Option<bool>,
    pub non_compete_clause: Option<bool>,
    pub termination_conditions: Option<String>,
    pub status: Option<ContractStatus>,
    pub signed: Option<bool>,
    pub signed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: Option<Value>,
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

impl Contract {
    /// Overwrites every field the patch supplies. Ownership, id and
    /// timestamps are never touched here.
    pub fn apply_patch(&mut self, patch: ContractPatch) {
        set(&mut self.title, patch.title);
        set(&mut self.content, patch.content);
        set(&mut self.contract_type, patch.contract_type);
        set(&mut self.party_1_name, patch.party_1_name);
        set(&mut self.party_1_role, patch.party_1_role);
        set_opt(&mut self.party_1_address, patch.party_1_address);
        set(&mut self.party_2_name, patch.party_2_name);
        set(&mut self.party_2_role, patch.party_2_role);
        set_opt(&mut self.party_2_address, patch.party_2_address);
        set(&mut self.contract_purpose, patch.contract_purpose);
        set(&mut self.scope_of_work, patch.scope_of_work);
        set(&mut self.contract_duration, patch.contract_duration);
        set_opt(&mut self.start_date, patch.start_date);
        set_opt(&mut self.end_date, patch.end_date);
        set(&mut self.auto_renewal, patch.auto_renewal);
        set(&mut self.payment_type, patch.payment_type);
        set(&mut self.payment_amount, patch.payment_amount);
        set_opt(&mut self.currency, patch.currency);
        set(&mut self.payment_schedule, patch.payment_schedule);
        set(&mut self.confidentiality_clause, patch.confidentiality_clause);
        set(&mut self.non_compete_clause, patch.non_compete_clause);
        set_opt(&mut self.termination_conditions, patch.termination_conditions);
        set(&mut self.status, patch.status);
        set(&mut self.signed, patch.signed);
        set_opt(&mut self.signed_at, patch.signed_at);
        set_opt(&mut self.expires_at, patch.expires_at);
        set_opt(&mut self.metadata, patch.metadata);
    }
}

//=========================================================================================
// Documents, Consultations and Notifications
//=========================================================================================

/// Represents an uploaded file plus the text extracted from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub file_path: String,
    pub content: String,
    pub metadata: Value,
    pub analyzed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDocument {
    pub title: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub file_path: String,
    pub content: String,
    pub metadata: Value,
    pub analyzed: bool,
}

/// A single logged exchange with the AI delegate. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct AiConsultation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    pub response: String,
    pub created_at: DateTime<Utc>,
}

/// Kind tag for notifications raised after an upload has been analyzed.
pub const NOTIFICATION_CONTRACT_UPLOADED: &str = "CONTRACT_UPLOADED";

/// A message for a user. Only the `seen` flag ever changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub message: String,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Validation
//=========================================================================================

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

//=========================================================================================
// AI Delegate Payloads
//=========================================================================================

/// Structured fields used to draft a contract. Every field is optional;
/// missing values are replaced by defaults when the prompt is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractDraftRequest {
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
    pub payment_amount: Option<String>,
    pub currency: Option<String>,
    pub payment_schedule: Option<String>,
    pub confidentiality_clause: Option<bool>,
    pub non_compete_clause: Option<bool>,
    pub termination_conditions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedParty {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub role: String,
    #[serde(deserialize_with = "lenient_string")]
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedDuration {
    #[serde(deserialize_with = "optional_lenient_string")]
    pub start_date: Option<String>,
    #[serde(deserialize_with = "optional_lenient_string")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedPayment {
    #[serde(deserialize_with = "lenient_string")]
    pub payment_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub amount: String,
    #[serde(deserialize_with = "lenient_string")]
    pub currency: String,
    #[serde(deserialize_with = "lenient_string")]
    pub payment_schedule: String,
}

/// The fixed schema returned by contract field extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedContract {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub contract_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(deserialize_with = "null_as_default")]
    pub parties: Vec<ExtractedParty>,
    #[serde(deserialize_with = "lenient_string")]
    pub contract_purpose: String,
    #[serde(deserialize_with = "lenient_string")]
    pub scope_of_work: String,
    #[serde(deserialize_with = "null_as_default")]
    pub duration: ExtractedDuration,
    #[serde(deserialize_with = "null_as_default")]
    pub payment: ExtractedPayment,
    #[serde(deserialize_with = "lenient_bool")]
    pub confidentiality_clause: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub non_compete_clause: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub termination_conditions: String,
}

impl ExtractedContract {
    /// The result reported for empty input, produced without any model call.
    pub fn unknown() -> Self {
        Self {
            title: "Unknown Contract".to_string(),
            contract_type: "OTHER".to_string(),
            content: String::new(),
            parties: Vec::new(),
            contract_purpose: String::new(),
            scope_of_work: String::new(),
            duration: ExtractedDuration::default(),
            payment: ExtractedPayment {
                payment_type: "OTHER".to_string(),
                amount: "0".to_string(),
                currency: "BRL".to_string(),
                payment_schedule: "OTHER".to_string(),
            },
            confidentiality_clause: false,
            non_compete_clause: false,
            termination_conditions: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = lenient_string(deserializer)?;
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "medium" | "moderate" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            _ => RiskLevel::Unknown,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifiedRisk {
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "lenient_string")]
    pub severity: String,
    #[serde(deserialize_with = "lenient_string")]
    pub context: String,
    #[serde(deserialize_with = "lenient_string")]
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbiguousTerm {
    #[serde(deserialize_with = "lenient_string")]
    pub term: String,
    #[serde(deserialize_with = "lenient_string")]
    pub context: String,
    #[serde(deserialize_with = "lenient_string")]
    pub recommendation: String,
}

/// Risk analysis of a contract text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RiskReport {
    pub overall_risk_assessment: RiskLevel,
    #[serde(deserialize_with = "null_as_default")]
    pub identified_risks: Vec<IdentifiedRisk>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub missing_clauses: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub ambiguous_terms: Vec<AmbiguousTerm>,
    #[serde(deserialize_with = "lenient_string_list")]
    pub recommended_improvements: Vec<String>,
}

/// Reported in `missing_clauses` when there is no text to analyze.
pub const EMPTY_CONTRACT_NOTICE: &str = "Cannot analyze empty contract";

impl RiskReport {
    /// The report returned for empty input, produced without any model call.
    pub fn empty_contract() -> Self {
        Self {
            overall_risk_assessment: RiskLevel::Unknown,
            identified_risks: Vec::new(),
            missing_clauses: vec![EMPTY_CONTRACT_NOTICE.to_string()],
            ambiguous_terms: Vec::new(),
            recommended_improvements: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_sentinel_decodes_to_unlimited() {
        assert_eq!(Quota::from_raw(-1), Quota::Unlimited);
        assert_eq!(Quota::from_raw(5), Quota::Limited(5));
        assert_eq!(Quota::Unlimited.to_raw(), -1);
        assert_eq!(Quota::Unlimited.remaining(1_000_000), None);
        assert_eq!(Quota::Limited(2).remaining(5), Some(0));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("draft".parse::<ContractStatus>(), Ok(ContractStatus::Draft));
        assert_eq!(" SIGNED ".parse::<ContractStatus>(), Ok(ContractStatus::Signed));
        assert!("archived".parse::<ContractStatus>().is_err());
        assert_eq!(ContractStatus::Terminated.to_string(), "TERMINATED");
    }

    #[test]
    fn risk_report_parses_loose_model_output() {
        let raw = r#"{
            "overallRiskAssessment": "HIGH",
            "identifiedRisks": [{"description": "No liability cap", "severity": "High", "context": null}],
            "missingClauses": ["Force majeure"]
        }"#;
        let report: RiskReport = serde_json::from_str(raw).unwrap();
        assert_eq!(report.overall_risk_assessment, RiskLevel::High);
        assert_eq!(report.identified_risks[0].context, "");
        assert!(report.ambiguous_terms.is_empty());
        assert_eq!(report.missing_clauses, vec!["Force majeure".to_string()]);
    }

    #[test]
    fn extracted_contract_accepts_numeric_amounts() {
        let raw = r#"{"title": "NDA", "payment": {"amount": 2500, "currency": "USD"}}"#;
        let extracted: ExtractedContract = serde_json::from_str(raw).unwrap();
        assert_eq!(extracted.payment.amount, "2500");
        assert_eq!(extracted.title, "NDA");
        assert!(extracted.parties.is_empty());
    }

    #[test]
    fn extracted_contract_tolerates_null_fields() {
        let raw = r#"{"title": "NDA", "confidentiality_clause": null, "non_compete_clause": "yes",
            "parties": null, "duration": null, "payment": null}"#;
        let extracted: ExtractedContract = serde_json::from_str(raw).unwrap();
        assert_eq!(extracted.title, "NDA");
        assert!(!extracted.confidentiality_clause);
        assert!(extracted.non_compete_clause);
        assert!(extracted.parties.is_empty());
        assert_eq!(extracted.duration, ExtractedDuration::default());
        assert_eq!(extracted.payment, ExtractedPayment::default());
    }

    #[test]
    fn risk_report_tolerates_null_lists_and_object_items() {
        let raw = r#"{
            "overallRiskAssessment": "medium",
            "identifiedRisks": null,
            "ambiguousTerms": null,
            "missingClauses": [{"clause": "Limitation of liability"}, "Force majeure"],
            "recommendedImprovements": null
        }"#;
        let report: RiskReport = serde_json::from_str(raw).unwrap();
        assert_eq!(report.overall_risk_assessment, RiskLevel::Medium);
        assert!(report.identified_risks.is_empty());
        assert!(report.ambiguous_terms.is_empty());
        assert!(report.recommended_improvements.is_empty());
        assert_eq!(
            report.missing_clauses,
            vec!["Limitation of liability".to_string(), "Force majeure".to_string()]
        );
    }
}
