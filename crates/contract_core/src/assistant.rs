//! crates/contract_core/src/assistant.rs
//!
//! Builds the prompts sent to the AI delegate and shapes its replies into
//! typed results. The delegate itself only moves text; everything that
//! decides *what* to ask and *how* to read the answer lives here.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::domain::{ContractDraftRequest, ExtractedContract, RiskReport};
use crate::ports::{AiDelegate, CompletionPurpose, CompletionRequest, PortError, PortResult};

const DRAFT_SYSTEM_PROMPT: &str = "You are an expert legal contract writer. Your task is to draft comprehensive, legally sound contracts based on the information provided. Use formal legal language, proper formatting, and ensure all critical clauses are included.";

const EXTRACTION_SYSTEM_PROMPT: &str = "You are a legal document analyzer capable of extracting structured information from contracts. Respond with a single valid JSON object and nothing else.";

const RISK_SYSTEM_PROMPT: &str = "You are a legal document analysis expert specializing in risk assessment. Provide detailed contract analysis focusing on risks and critical issues. Respond with a single valid JSON object and nothing else.";

const EXTRACTION_PROMPT_TEMPLATE: &str = r#"Extract the following information from this contract text:

1. Contract title
2. Contract type (e.g., SERVICE, NDA, EMPLOYMENT, LEASE, etc.)
3. Party information (names, roles, addresses)
4. Contract purpose
5. Scope of work
6. Contract duration (start date, end date)
7. Payment information (amount, schedule, currency)
8. Whether it includes confidentiality clauses
9. Whether it includes non-compete clauses
10. Termination conditions

Contract text:
{text}... (contract continues)

Return ONLY a valid JSON object with these keys:
"title", "contract_type", "parties" (array of {"name", "role", "address"}),
"contract_purpose", "scope_of_work", "duration" ({"start_date", "end_date"}),
"payment" ({"payment_type", "amount", "currency", "payment_schedule"}),
"confidentiality_clause" (boolean), "non_compete_clause" (boolean),
"termination_conditions"."#;

const RISK_PROMPT_TEMPLATE: &str = r#"Analyze the following contract content and identify potential risks, ambiguities, or missing critical clauses.
Focus on legal, financial, and operational risks.

Here's a partial content of the contract to analyze:
{text}... (contract continues)

Provide a structured analysis with the following:
1. Overall risk assessment (Low, Medium, High)
2. Identified risks (list each with severity rating)
3. Missing critical clauses
4. Ambiguous or vague terms
5. Recommended improvements

Return the analysis as a valid JSON object with these keys:
"overallRiskAssessment" ("Low" | "Medium" | "High"),
"identifiedRisks" (array of {"description", "category", "severity", "context", "recommendation"}),
"missingClauses" (array of strings),
"ambiguousTerms" (array of {"term", "context", "recommendation"}),
"recommendedImprovements" (array of strings)."#;

/// Characters of contract text sent for field extraction.
pub const EXTRACTION_INPUT_LIMIT: usize = 3000;
/// Characters of contract text sent for risk analysis.
pub const RISK_INPUT_LIMIT: usize = 2500;

const DRAFT_TEMPERATURE: f32 = 0.7;
const DRAFT_MAX_TOKENS: u32 = 4000;
const ANALYSIS_TEMPERATURE: f32 = 0.1;
const ANALYSIS_MAX_TOKENS: u32 = 2000;

//=========================================================================================
// The Assistant
//=========================================================================================

/// Drafting, extraction and risk analysis on top of an [`AiDelegate`].
#[derive(Clone)]
pub struct ContractAssistant {
    delegate: Arc<dyn AiDelegate>,
    timeout: Duration,
}

impl ContractAssistant {
    /// Creates a new `ContractAssistant`. Every delegate call is bounded by `timeout`.
    pub fn new(delegate: Arc<dyn AiDelegate>, timeout: Duration) -> Self {
        Self { delegate, timeout }
    }

    /// The delegate's method tag, recorded alongside extracted data.
    pub fn method_tag(&self) -> &'static str {
        self.delegate.method_tag()
    }

    /// Drafts a full contract from structured fields. The model's text is
    /// returned verbatim; nothing is persisted.
    pub async fn generate_contract(&self, draft: &ContractDraftRequest) -> PortResult<String> {
        let request = CompletionRequest {
            purpose: CompletionPurpose::Draft,
            system_prompt: DRAFT_SYSTEM_PROMPT.to_string(),
            user_prompt: build_contract_prompt(draft),
            temperature: DRAFT_TEMPERATURE,
            max_tokens: DRAFT_MAX_TOKENS,
            expects_json: false,
        };
        info!("Requesting contract draft from AI delegate.");
        self.complete(&request).await
    }

    /// Extracts the fixed field schema from free contract text.
    pub async fn extract_contract_info(&self, text: &str) -> PortResult<ExtractedContract> {
        if text.trim().is_empty() {
            warn!("Empty contract text provided for extraction");
            return Ok(ExtractedContract::unknown());
        }

        let excerpt = truncate_chars(text, EXTRACTION_INPUT_LIMIT);
        let request = CompletionRequest {
            purpose: CompletionPurpose::Extraction,
            system_prompt: EXTRACTION_SYSTEM_PROMPT.to_string(),
            user_prompt: EXTRACTION_PROMPT_TEMPLATE.replace("{text}", excerpt),
            temperature: ANALYSIS_TEMPERATURE,
            max_tokens: ANALYSIS_MAX_TOKENS,
            expects_json: true,
        };
        info!("Extracting contract data ({} chars) with AI delegate.", excerpt.chars().count());
        let raw = self.complete(&request).await?;
        parse_json_reply(&raw)
    }

    /// Produces a risk report for free contract text.
    pub async fn analyze_contract_risks(&self, text: &str) -> PortResult<RiskReport> {
        if text.trim().is_empty() {
            warn!("Empty contract content provided for analysis");
            return Ok(RiskReport::empty_contract());
        }

        let excerpt = truncate_chars(text, RISK_INPUT_LIMIT);
        let request = CompletionRequest {
            purpose: CompletionPurpose::RiskAnalysis,
            system_prompt: RISK_SYSTEM_PROMPT.to_string(),
            user_prompt: RISK_PROMPT_TEMPLATE.replace("{text}", excerpt),
            temperature: ANALYSIS_TEMPERATURE,
            max_tokens: ANALYSIS_MAX_TOKENS,
            expects_json: true,
        };
        info!("Analyzing contract risks ({} chars) with AI delegate.", excerpt.chars().count());
        let raw = self.complete(&request).await?;
        parse_json_reply(&raw)
    }

    /// Runs one delegate call under the timeout and folds every failure
    /// into `PortError::AiDelegate`.
    async fn complete(&self, request: &CompletionRequest) -> PortResult<String> {
        match tokio::time::timeout(self.timeout, self.delegate.complete(request)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(PortError::AiDelegate(message))) => Err(PortError::AiDelegate(message)),
            Ok(Err(other)) => Err(PortError::AiDelegate(other.to_string())),
            Err(_) => Err(PortError::AiDelegate(format!(
                "AI request timed out after {} seconds",
                self.timeout.as_secs()
            ))),
        }
    }
}

//=========================================================================================
// Prompt and Reply Helpers
//=========================================================================================

static CODE_FENCE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```"));

/// Returns `value` unless it is missing or blank.
fn or_default<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => v,
        _ => default,
    }
}

/// Builds the drafting prompt, substituting defaults for missing fields.
pub fn build_contract_prompt(d: &ContractDraftRequest) -> String {
    let mut clauses = String::new();
    if d.confidentiality_clause.unwrap_or(false) {
        clauses.push_str("- Include a detailed confidentiality clause\n");
    }
    if d.non_compete_clause.unwrap_or(false) {
        clauses.push_str("- Include a detailed non-compete clause\n");
    }

    format!(
        r#"Please generate a complete legal contract with the following specifications:

## Basic Information
- Title: {title}
- Type: {contract_type}

## Parties Involved
- Party 1 ({p1_role}): {p1_name}
  Address: {p1_address}
- Party 2 ({p2_role}): {p2_name}
  Address: {p2_address}

## Contract Details
- Purpose: {purpose}
- Scope of Work: {scope}

## Duration
- Duration: {duration}
- Start Date: {start}
- End Date: {end}
- Auto Renewal: {renewal}

## Payment Information
- Payment Type: {payment_type}
- Payment Amount: {amount} {currency}
- Payment Schedule: {schedule}

## Specific Clauses
{clauses}- Termination Conditions: {termination}

The contract should be structured with clear sections including definitions, rights and obligations of both parties, terms and conditions, legal provisions, signatures, etc. Format the contract in a professional legal document style.
"#,
        title = or_default(&d.title, "Untitled Contract"),
        contract_type = or_default(&d.contract_type, "SERVICE"),
        p1_role = or_default(&d.party_1_role, "First Party"),
        p1_name = or_default(&d.party_1_name, "Party 1"),
        p1_address = or_default(&d.party_1_address, "Address not provided"),
        p2_role = or_default(&d.party_2_role, "Second Party"),
        p2_name = or_default(&d.party_2_name, "Party 2"),
        p2_address = or_default(&d.party_2_address, "Address not provided"),
        purpose = or_default(&d.contract_purpose, "Purpose not specified"),
        scope = or_default(&d.scope_of_work, "Scope not specified"),
        duration = or_default(&d.contract_duration, "Duration not specified"),
        start = or_default(&d.start_date, "Start date not specified"),
        end = or_default(&d.end_date, "End date not specified"),
        renewal = if d.auto_renewal.unwrap_or(false) { "Yes" } else { "No" },
        payment_type = or_default(&d.payment_type, "Payment type not specified"),
        amount = or_default(&d.payment_amount, "Amount not specified"),
        currency = or_default(&d.currency, "USD"),
        schedule = or_default(&d.payment_schedule, "Schedule not specified"),
        clauses = clauses,
        termination = or_default(&d.termination_conditions, "Standard termination terms"),
    )
}

/// Returns at most `limit` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Parses a model reply that should be one JSON object. Replies wrapped in
/// Markdown fences or surrounded by prose are accepted.
pub fn parse_json_reply<T: DeserializeOwned>(raw: &str) -> PortResult<T> {
    let fence = CODE_FENCE
        .as_ref()
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    let unfenced = fence
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str());

    let body = match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced.trim(),
    };

    serde_json::from_str(body)
        .map_err(|e| PortError::AiDelegate(format!("AI returned an unreadable response: {e}")))
}
