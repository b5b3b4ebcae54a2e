//! crates/contract_core/src/contracts.rs
//!
//! Owner-scoped contract operations. Every read, update and delete goes
//! through [`ContractService::load_owned`], which reports a contract that
//! exists but belongs to someone else exactly like one that does not exist.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::assistant::ContractAssistant;
use crate::domain::{
    Contract, ContractInput, ContractPatch, FieldError, NewContract, RiskReport,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Clone)]
pub struct ContractService {
    db: Arc<dyn DatabaseService>,
    assistant: ContractAssistant,
}

impl ContractService {
    pub fn new(db: Arc<dyn DatabaseService>, assistant: ContractAssistant) -> Self {
        Self { db, assistant }
    }

    /// Loads a contract and checks it belongs to `user_id`.
    pub async fn load_owned(&self, contract_id: Uuid, user_id: Uuid) -> PortResult<Contract> {
        match self.db.get_contract_by_id(contract_id).await {
            Ok(contract) if contract.user_id == user_id => Ok(contract),
            Ok(_) | Err(PortError::NotFound(_)) => {
                Err(PortError::NotFound(format!("Contract {contract_id} not found")))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, user_id: Uuid, input: ContractInput) -> PortResult<Contract> {
        let contract = validate_new_contract(input).map_err(PortError::Validation)?;
        let created = self.db.insert_contract(user_id, contract).await?;
        info!("Created contract {} for user {}", created.id, user_id);
        Ok(created)
    }

    pub async fn find_all(&self, user_id: Uuid) -> PortResult<Vec<Contract>> {
        self.db.list_contracts_by_user(user_id).await
    }

    pub async fn find_by_id(&self, contract_id: Uuid, user_id: Uuid) -> PortResult<Contract> {
        self.load_owned(contract_id, user_id).await
    }

    /// Applies a partial update. Fields absent from the patch keep their value.
    pub async fn update(
        &self,
        contract_id: Uuid,
        user_id: Uuid,
        patch: ContractPatch,
    ) -> PortResult<Contract> {
        let patch = validate_patch(patch).map_err(PortError::Validation)?;
        let mut contract = self.load_owned(contract_id, user_id).await?;
        contract.apply_patch(patch);
        contract.updated_at = Utc::now();
        self.db.update_contract(&contract).await
    }

    pub async fn delete(&self, contract_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let contract = self.load_owned(contract_id, user_id).await?;
        self.db.delete_contract(contract.id).await?;
        info!("Deleted contract {} for user {}", contract_id, user_id);
        Ok(())
    }

    /// Runs a risk analysis on an owned contract and logs the exchange as
    /// an AI consultation.
    pub async fn analyze(
        &self,
        contract_id: Uuid,
        user_id: Uuid,
    ) -> PortResult<(Contract, RiskReport)> {
        let contract = self.load_owned(contract_id, user_id).await?;
        info!(
            "Analyzing contract {} with content length: {}",
            contract.id,
            contract.content.chars().count()
        );
        let report = self.assistant.analyze_contract_risks(&contract.content).await?;

        let query = format!("Risk analysis for contract {}", contract.id);
        let response = serde_json::to_string(&report)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if let Err(e) = self.db.save_consultation(user_id, &query, &response).await {
            error!("Failed to log AI consultation for contract {}: {}", contract.id, e);
        }

        Ok((contract, report))
    }
}

//=========================================================================================
// Validation
//=========================================================================================

/// Whether `value` is a plain decimal: optional sign, digits, optional
/// fraction. Exponents and a trailing `.` are rejected.
pub fn is_numeric(value: &str) -> bool {
    canonical_amount(value).is_some()
}

/// Rewrites a plain decimal the way a `NUMERIC` column prints it back: no
/// `+`, no redundant leading zeros, a `0` before a bare fraction, and no sign
/// on zero. Trailing fraction zeros are kept.
pub fn canonical_amount(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    let (int_part, fraction) = match unsigned.split_once('.') {
        Some((int, frac)) if all_digits(int) && !frac.is_empty() && all_digits(frac) => {
            (int, Some(frac))
        }
        None if !unsigned.is_empty() && all_digits(unsigned) => (unsigned, None),
        _ => return None,
    };

    let int_part = match int_part.trim_start_matches('0') {
        "" => "0",
        digits => digits,
    };
    let is_zero = int_part == "0" && fraction.map_or(true, |f| f.bytes().all(|b| b == b'0'));
    let sign = if negative && !is_zero { "-" } else { "" };
    Some(match fraction {
        Some(frac) => format!("{sign}{int_part}.{frac}"),
        None => format!("{sign}{int_part}"),
    })
}

/// Checks the required creation fields and collects every failure.
pub fn validate_new_contract(input: ContractInput) -> Result<NewContract, Vec<FieldError>> {
    let mut errors = Vec::new();

    let mut required = |value: Option<String>, field: &str, message: &str| -> String {
        match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                errors.push(FieldError::new(field, message));
                String::new()
            }
        }
    };

    let title = required(input.title, "title", "Title is required");
    let content = required(input.content, "content", "Content is required");
    let contract_type = required(input.contract_type, "contract_type", "Contract type is required");
    let party_1_name = required(input.party_1_name, "party_1_name", "Party 1 name is required");
    let party_1_role = required(input.party_1_role, "party_1_role", "Party 1 role is required");
    let party_2_name = required(input.party_2_name, "party_2_name", "Party 2 name is required");
    let party_2_role = required(input.party_2_role, "party_2_role", "Party 2 role is required");
    let contract_purpose = required(
        input.contract_purpose,
        "contract_purpose",
        "Contract purpose is required",
    );
    let scope_of_work = required(input.scope_of_work, "scope_of_work", "Scope of work is required");
    let contract_duration = required(
        input.contract_duration,
        "contract_duration",
        "Contract duration is required",
    );
    let payment_type = required(input.payment_type, "payment_type", "Payment type is required");
    let payment_schedule = required(
        input.payment_schedule,
        "payment_schedule",
        "Payment schedule is required",
    );

    let payment_amount = match input.payment_amount.as_deref().and_then(canonical_amount) {
        Some(canonical) => canonical,
        None => {
            errors.push(FieldError::new(
                "payment_amount",
                "Payment amount is required and must be a number",
            ));
            String::new()
        }
    };

    if input.metadata.as_ref().is_some_and(|m| !m.is_object()) {
        errors.push(FieldError::new("metadata", "Metadata must be an object"));
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewContract {
        title,
        content,
        contract_type,
        party_1_name,
        party_1_role,
        party_1_address: input.party_1_address,
        party_2_name,
        party_2_role,
        party_2_address: input.party_2_address,
        contract_purpose,
        scope_of_work,
        contract_duration,
        start_date: input.start_date,
        end_date: input.end_date,
        auto_renewal: input.auto_renewal.unwrap_or(false),
        payment_type,
        payment_amount,
        currency: input.currency,
        payment_schedule,
        confidentiality_clause: input.confidentiality_clause.unwrap_or(false),
        non_compete_clause: input.non_compete_clause.unwrap_or(false),
        termination_conditions: input.termination_conditions,
        metadata: input.metadata,
    })
}

/// Type checks for the few patch fields that carry more than a type.
/// Returns the patch with its amount in canonical form.
pub fn validate_patch(mut patch: ContractPatch) -> Result<ContractPatch, Vec<FieldError>> {
    let mut errors = Vec::new();
    if let Some(amount) = patch.payment_amount.take() {
        match canonical_amount(&amount) {
            Some(canonical) => patch.payment_amount = Some(canonical),
            None => errors.push(FieldError::new(
                "payment_amount",
                "Payment amount must be a number",
            )),
        }
    }
    if patch.metadata.as_ref().is_some_and(|m| !m.is_object()) {
        errors.push(FieldError::new("metadata", "Metadata must be an object"));
    }
    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContractStatus, EMPTY_CONTRACT_NOTICE};
    use crate::testing::{sample_contract_input, InMemoryDatabase, ScriptedDelegate};
    use chrono::NaiveDate;
    use serde_json::json;
    use std::time::Duration;

    fn service_with(delegate: Arc<ScriptedDelegate>) -> (ContractService, Arc<InMemoryDatabase>) {
        let db = Arc::new(InMemoryDatabase::new());
        let assistant = ContractAssistant::new(delegate, Duration::from_secs(5));
        (ContractService::new(db.clone(), assistant), db)
    }

    fn service() -> (ContractService, Arc<InMemoryDatabase>) {
        service_with(Arc::new(ScriptedDelegate::replying("{}")))
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips_fields() {
        let (svc, _db) = service();
        let owner = Uuid::new_v4();
        let mut input = sample_contract_input();
        input.party_1_address = Some("123 Business St".to_string());
        input.start_date = NaiveDate::from_ymd_opt(2025, 3, 1);
        input.metadata = Some(json!({"source": "manual"}));

        let created = svc.create(owner, input).await.unwrap();
        let fetched = svc.find_by_id(created.id, owner).await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.title, "Service Agreement");
        assert_eq!(fetched.party_1_address.as_deref(), Some("123 Business St"));
        assert_eq!(fetched.payment_amount, "10000");
        assert_eq!(fetched.start_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(fetched.status, ContractStatus::Draft);
        assert!(!fetched.signed);
    }

    #[tokio::test]
    async fn create_reports_every_missing_required_field() {
        let (svc, _db) = service();
        let err = svc.create(Uuid::new_v4(), ContractInput::default()).await.unwrap_err();

        let PortError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        for field in [
            "title",
            "content",
            "contract_type",
            "party_1_name",
            "party_1_role",
            "party_2_name",
            "party_2_role",
            "contract_purpose",
            "scope_of_work",
            "contract_duration",
            "payment_type",
            "payment_amount",
            "payment_schedule",
        ] {
            assert!(fields.contains(&field), "missing error for {field}");
        }
    }

    fn blank_field(input: &mut ContractInput, field: &str) {
        match field {
            "title" => input.title = Some(" ".to_string()),
            "content" => input.content = None,
            "contract_type" => input.contract_type = Some(String::new()),
            "party_1_name" => input.party_1_name = None,
            "party_1_role" => input.party_1_role = None,
            "party_2_name" => input.party_2_name = None,
            "party_2_role" => input.party_2_role = None,
            "contract_purpose" => input.contract_purpose = None,
            "scope_of_work" => input.scope_of_work = None,
            "contract_duration" => input.contract_duration = None,
            "payment_type" => input.payment_type = None,
            "payment_amount" => input.payment_amount = Some("ten".to_string()),
            "payment_schedule" => input.payment_schedule = None,
            other => panic!("unknown field {other}"),
        }
    }

    #[tokio::test]
    async fn create_rejects_each_blank_required_field() {
        let (svc, db) = service();
        for field in [
            "title",
            "content",
            "contract_type",
            "party_1_name",
            "party_1_role",
            "party_2_name",
            "party_2_role",
            "contract_purpose",
            "scope_of_work",
            "contract_duration",
            "payment_type",
            "payment_amount",
            "payment_schedule",
        ] {
            let mut input = sample_contract_input();
            blank_field(&mut input, field);
            match svc.create(Uuid::new_v4(), input).await {
                Err(PortError::Validation(errors)) => {
                    assert_eq!(errors.len(), 1);
                    assert_eq!(errors[0].field, field);
                }
                other => panic!("expected validation error for {field}, got {other:?}"),
            }
        }
        assert_eq!(db.contract_count(), 0);
    }

    #[tokio::test]
    async fn other_users_always_get_not_found() {
        let (svc, _db) = service();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let contract = svc.create(owner, sample_contract_input()).await.unwrap();

        assert!(matches!(
            svc.find_by_id(contract.id, intruder).await,
            Err(PortError::NotFound(_))
        ));
        let patch = ContractPatch {
            title: Some("Hijacked".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update(contract.id, intruder, patch).await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            svc.delete(contract.id, intruder).await,
            Err(PortError::NotFound(_))
        ));

        let untouched = svc.find_by_id(contract.id, owner).await.unwrap();
        assert_eq!(untouched.title, contract.title);
        assert!(svc.find_all(intruder).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_contract_is_not_found() {
        let (svc, _db) = service();
        let err = svc.find_by_id(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn empty_patch_only_moves_updated_at() {
        let (svc, _db) = service();
        let owner = Uuid::new_v4();
        let created = svc.create(owner, sample_contract_input()).await.unwrap();

        let updated = svc.update(created.id, owner, ContractPatch::default()).await.unwrap();

        let mut expected = created.clone();
        expected.updated_at = updated.updated_at;
        assert_eq!(updated, expected);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn partial_patch_changes_only_supplied_fields() {
        let (svc, _db) = service();
        let owner = Uuid::new_v4();
        let created = svc.create(owner, sample_contract_input()).await.unwrap();

        let patch = ContractPatch {
            status: Some(ContractStatus::Signed),
            signed: Some(true),
            payment_amount: Some("12500.50".to_string()),
            ..Default::default()
        };
        let updated = svc.update(created.id, owner, patch).await.unwrap();

        assert_eq!(updated.status, ContractStatus::Signed);
        assert!(updated.signed);
        assert_eq!(updated.payment_amount, "12500.50");
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.content, created.content);
    }

    #[tokio::test]
    async fn patch_with_non_numeric_amount_is_rejected() {
        let (svc, _db) = service();
        let owner = Uuid::new_v4();
        let created = svc.create(owner, sample_contract_input()).await.unwrap();
        let patch = ContractPatch {
            payment_amount: Some("a lot".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update(created.id, owner, patch).await,
            Err(PortError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn amounts_are_stored_in_canonical_form() {
        let (svc, _db) = service();
        let owner = Uuid::new_v4();
        let mut input = sample_contract_input();
        input.payment_amount = Some("+.50".to_string());
        let created = svc.create(owner, input).await.unwrap();
        assert_eq!(created.payment_amount, "0.50");

        let patch = ContractPatch {
            payment_amount: Some(" 007 ".to_string()),
            ..Default::default()
        };
        let updated = svc.update(created.id, owner, patch).await.unwrap();
        assert_eq!(updated.payment_amount, "7");
    }

    #[tokio::test]
    async fn exponent_amounts_are_rejected() {
        let (svc, _db) = service();
        let mut input = sample_contract_input();
        input.payment_amount = Some("1e3".to_string());
        match svc.create(Uuid::new_v4(), input).await {
            Err(PortError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "payment_amount");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn amount_grammar_matches_plain_decimals_only() {
        for valid in ["10000", "1500.75", "-3", ".5", "+5", "0.00"] {
            assert!(is_numeric(valid), "{valid} should be accepted");
        }
        for invalid in ["1e3", "5.", "", "-", "1,000", "NaN", "inf", "1.2.3", " "] {
            assert!(!is_numeric(invalid), "{invalid} should be rejected");
        }
        assert_eq!(canonical_amount("-0.0").as_deref(), Some("0.0"));
        assert_eq!(canonical_amount("-012.30").as_deref(), Some("-12.30"));
    }

    #[tokio::test]
    async fn delete_removes_contract() {
        let (svc, db) = service();
        let owner = Uuid::new_v4();
        let created = svc.create(owner, sample_contract_input()).await.unwrap();

        svc.delete(created.id, owner).await.unwrap();

        assert_eq!(db.contract_count(), 0);
        assert!(matches!(
            svc.find_by_id(created.id, owner).await,
            Err(PortError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn analyzing_empty_content_skips_the_delegate_and_logs_consultation() {
        let delegate = Arc::new(ScriptedDelegate::replying("{}"));
        let (svc, db) = service_with(delegate.clone());
        let owner = Uuid::new_v4();
        let created = svc.create(owner, sample_contract_input()).await.unwrap();
        let patch = ContractPatch {
            content: Some(String::new()),
            ..Default::default()
        };
        svc.update(created.id, owner, patch).await.unwrap();

        let (_, report) = svc.analyze(created.id, owner).await.unwrap();

        assert!(report.missing_clauses.contains(&EMPTY_CONTRACT_NOTICE.to_string()));
        assert_eq!(delegate.calls(), 0);
        let consultations = db.list_consultations_by_user(owner).await.unwrap();
        assert_eq!(consultations.len(), 1);
        assert!(consultations[0].query.contains(&created.id.to_string()));
    }
}
