//! services/api/src/adapters/fixture_llm.rs
//!
//! A deterministic `AiDelegate` that answers every purpose with a canned
//! reply. Used by the router tests and by the server when no
//! `OPENAI_API_KEY` is configured.

use async_trait::async_trait;
use chrono::{Months, Utc};
use contract_core::ports::{AiDelegate, CompletionPurpose, CompletionRequest, PortResult};
use serde_json::json;

const FIXTURE_DRAFT: &str = "SERVICES AGREEMENT

This Services Agreement (the \"Agreement\") is entered into by and between the parties identified below.

1. SERVICES
The Service Provider shall perform the services described in the scope of work with due care and skill.

2. TERM
This Agreement commences on the start date and continues for the stated duration unless terminated earlier in accordance with Section 5.

3. COMPENSATION
The Client shall pay the Service Provider the agreed amount according to the payment schedule.

4. CONFIDENTIALITY
Each party shall keep confidential all non-public information received from the other party.

5. TERMINATION
Either party may terminate this Agreement with thirty (30) days written notice.

6. GOVERNING LAW
This Agreement shall be governed by the laws of the jurisdiction in which the Service Provider is located.

IN WITNESS WHEREOF, the parties have executed this Agreement as of the date last signed below.";

#[derive(Clone, Copy, Debug, Default)]
pub struct FixtureAiDelegate;

impl FixtureAiDelegate {
    fn extraction_reply() -> String {
        let today = Utc::now().date_naive();
        let end = today.checked_add_months(Months::new(6)).unwrap_or(today);
        json!({
            "title": "Service Agreement",
            "contract_type": "SERVICE",
            "parties": [
                {
                    "name": "TechCorp",
                    "role": "Service Provider",
                    "address": "123 Tech Street, Silicon Valley, CA"
                },
                {
                    "name": "ClientName",
                    "role": "Client",
                    "address": "456 Client Avenue, Business District, NY"
                }
            ],
            "contract_purpose": "Provision of technical consulting services",
            "scope_of_work": "Technical consulting as described in Schedule A",
            "duration": {
                "start_date": today.to_string(),
                "end_date": end.to_string()
            },
            "payment": {
                "payment_type": "FIXED",
                "amount": "10000",
                "currency": "BRL",
                "payment_schedule": "MONTHLY"
            },
            "confidentiality_clause": true,
            "non_compete_clause": false,
            "termination_conditions": "30 days written notice by either party"
        })
        .to_string()
    }

    fn risk_reply() -> String {
        json!({
            "overallRiskAssessment": "Medium",
            "identifiedRisks": [
                {
                    "description": "Inadequate termination notice period",
                    "category": "Operational",
                    "severity": "High",
                    "context": "The contract only allows for 30 days notice for termination, which may be insufficient for proper transition",
                    "recommendation": "Extend notice period to 60-90 days"
                },
                {
                    "description": "Vague scope of work definition",
                    "category": "Legal",
                    "severity": "Medium",
                    "context": "The scope lacks specific deliverables and acceptance criteria",
                    "recommendation": "Define clear deliverables, milestones, and acceptance criteria"
                },
                {
                    "description": "No liability cap specified",
                    "category": "Financial",
                    "severity": "High",
                    "context": "Unlimited liability exposure for both parties",
                    "recommendation": "Add liability cap proportional to contract value"
                }
            ],
            "missingClauses": [
                "Dispute resolution mechanism",
                "Force majeure",
                "Data protection and privacy",
                "Insurance requirements"
            ],
            "ambiguousTerms": [
                {
                    "term": "reasonable efforts",
                    "context": "Service provider shall use reasonable efforts...",
                    "recommendation": "Define specific performance standards or SLAs"
                }
            ],
            "recommendedImprovements": [
                "Add detailed payment terms including late payment penalties",
                "Include change management procedure",
                "Add clear termination for convenience clause"
            ]
        })
        .to_string()
    }
}

#[async_trait]
impl AiDelegate for FixtureAiDelegate {
    async fn complete(&self, request: &CompletionRequest) -> PortResult<String> {
        Ok(match request.purpose {
            CompletionPurpose::Draft => FIXTURE_DRAFT.to_string(),
            CompletionPurpose::Extraction => Self::extraction_reply(),
            CompletionPurpose::RiskAnalysis => Self::risk_reply(),
        })
    }

    fn method_tag(&self) -> &'static str {
        "fixture"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contract_core::domain::{ExtractedContract, RiskLevel, RiskReport};

    fn request(purpose: CompletionPurpose) -> CompletionRequest {
        CompletionRequest {
            purpose,
            system_prompt: String::new(),
            user_prompt: String::new(),
            temperature: 0.1,
            max_tokens: 2000,
            expects_json: true,
        }
    }

    #[tokio::test]
    async fn canned_replies_parse_into_the_typed_schemas() {
        let delegate = FixtureAiDelegate;

        let raw = delegate.complete(&request(CompletionPurpose::Extraction)).await.unwrap();
        let extracted: ExtractedContract = serde_json::from_str(&raw).unwrap();
        assert_eq!(extracted.parties.len(), 2);
        assert!(extracted.duration.start_date.is_some());

        let raw = delegate.complete(&request(CompletionPurpose::RiskAnalysis)).await.unwrap();
        let report: RiskReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(report.overall_risk_assessment, RiskLevel::Medium);
        assert_eq!(report.missing_clauses.len(), 4);

        let draft = delegate.complete(&request(CompletionPurpose::Draft)).await.unwrap();
        assert!(draft.starts_with("SERVICES AGREEMENT"));
    }
}
