//! crates/contract_core/src/upload.rs
//!
//! Handles an uploaded contract file end to end: store the bytes, turn them
//! into text, extract structured fields, and record the resulting document.

use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::assistant::ContractAssistant;
use crate::domain::{Document, ExtractedContract, NewDocument, NOTIFICATION_CONTRACT_UPLOADED};
use crate::ports::{DatabaseService, DocumentStorage, PortError, PortResult, TextExtractionService};

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub extracted: ExtractedContract,
    pub document: Document,
}

#[derive(Clone)]
pub struct UploadService {
    db: Arc<dyn DatabaseService>,
    assistant: ContractAssistant,
    storage: Arc<dyn DocumentStorage>,
    extractor: Arc<dyn TextExtractionService>,
}

impl UploadService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        assistant: ContractAssistant,
        storage: Arc<dyn DocumentStorage>,
        extractor: Arc<dyn TextExtractionService>,
    ) -> Self {
        Self {
            db,
            assistant,
            storage,
            extractor,
        }
    }

    pub async fn upload_contract(
        &self,
        user_id: Uuid,
        file_name: &str,
        data: &[u8],
    ) -> PortResult<UploadOutcome> {
        let now = Utc::now();
        let stored_name = stored_file_name(file_name, now)?;
        let stored_path = self.storage.store(&stored_name, data).await?;
        info!("Stored upload '{}' for user {} at {}", file_name, user_id, stored_path);

        match self.record_upload(user_id, file_name, data, &stored_path, now).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if let Err(cleanup) = self.storage.remove(&stored_path).await {
                    error!("Failed to remove orphaned upload {}: {}", stored_path, cleanup);
                }
                Err(e)
            }
        }
    }

    async fn record_upload(
        &self,
        user_id: Uuid,
        file_name: &str,
        data: &[u8],
        stored_path: &str,
        now: DateTime<Utc>,
    ) -> PortResult<UploadOutcome> {
        let text = match self.extractor.extract_text(file_name, data).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("No text could be extracted from '{}'; using file metadata", file_name);
                placeholder_text(file_name, data.len())
            }
            Err(e) => {
                warn!("Text extraction failed for '{}': {}; using file metadata", file_name, e);
                placeholder_text(file_name, data.len())
            }
        };

        let mut extracted = self.assistant.extract_contract_info(&text).await?;
        let title = title_from_file_name(file_name);
        extracted.title = title.clone();
        extracted.content = text.clone();

        let document = NewDocument {
            title: title.clone(),
            file_name: file_name.to_string(),
            file_type: file_type_for(file_name).to_string(),
            file_size: data.len() as u64,
            file_path: stored_path.replace('\\', "/"),
            content: text,
            metadata: json!({
                "extractedAt": now.to_rfc3339(),
                "extractionMethod": self.assistant.method_tag(),
            }),
            analyzed: true,
        };
        let document = self.db.create_document(user_id, document).await?;

        let message = format!("Contract \"{title}\" was uploaded and analyzed.");
        if let Err(e) = self
            .db
            .create_notification(user_id, NOTIFICATION_CONTRACT_UPLOADED, &message)
            .await
        {
            error!("Failed to create upload notification for user {}: {}", user_id, e);
        }

        Ok(UploadOutcome {
            extracted,
            document,
        })
    }

    pub async fn list_uploaded(&self, user_id: Uuid) -> PortResult<Vec<Document>> {
        self.db.list_documents_by_user(user_id).await
    }
}

static UNSAFE_FILE_CHARS: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+"));

/// `<millis>_<sanitized name>`, unique per upload instant.
pub fn stored_file_name(file_name: &str, now: DateTime<Utc>) -> PortResult<String> {
    let unsafe_chars = UNSAFE_FILE_CHARS
        .as_ref()
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let cleaned = unsafe_chars.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');
    let cleaned = if cleaned.is_empty() { "upload" } else { cleaned };
    Ok(format!("{}_{}", now.timestamp_millis(), cleaned))
}

/// The document title: the file name without a trailing `.pdf`.
pub fn title_from_file_name(file_name: &str) -> String {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        file_name[..file_name.len() - 4].to_string()
    } else {
        file_name.to_string()
    }
}

fn file_type_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".txt") {
        "text/plain"
    } else if lower.ends_with(".md") {
        "text/markdown"
    } else {
        "application/pdf"
    }
}

fn placeholder_text(file_name: &str, size: usize) -> String {
    format!(
        "Uploaded contract document \"{file_name}\" ({size} bytes). \
         The file contents could not be converted to text."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryDatabase, MemoryStorage, ScriptedDelegate, StaticExtractor};
    use chrono::TimeZone;
    use std::time::Duration;

    const EXTRACTION_REPLY: &str = r#"{"title": "Services Agreement", "contract_type": "SERVICE",
        "parties": [{"name": "TechCorp", "role": "Service Provider", "address": "123 Tech Street"}],
        "payment": {"payment_type": "FIXED", "amount": "10000", "currency": "BRL", "payment_schedule": "MONTHLY"},
        "confidentiality_clause": true}"#;

    struct Harness {
        service: UploadService,
        db: Arc<InMemoryDatabase>,
        storage: Arc<MemoryStorage>,
        delegate: Arc<ScriptedDelegate>,
    }

    fn harness(extractor: StaticExtractor) -> Harness {
        let db = Arc::new(InMemoryDatabase::new());
        let storage = Arc::new(MemoryStorage::default());
        let delegate = Arc::new(ScriptedDelegate::replying(EXTRACTION_REPLY));
        let assistant = ContractAssistant::new(delegate.clone(), Duration::from_secs(5));
        let service = UploadService::new(db.clone(), assistant, storage.clone(), Arc::new(extractor));
        Harness {
            service,
            db,
            storage,
            delegate,
        }
    }

    #[tokio::test]
    async fn upload_stores_file_and_records_document() {
        let h = harness(StaticExtractor::text("SERVICES AGREEMENT between TechCorp and ClientName."));
        let owner = Uuid::new_v4();

        let outcome = h
            .service
            .upload_contract(owner, "Master Services.pdf", b"%PDF-1.4 fake")
            .await
            .unwrap();

        assert_eq!(outcome.extracted.title, "Master Services");
        assert_eq!(outcome.extracted.contract_type, "SERVICE");
        assert_eq!(outcome.extracted.parties.len(), 1);
        assert_eq!(outcome.extracted.content, "SERVICES AGREEMENT between TechCorp and ClientName.");

        let doc = &outcome.document;
        assert_eq!(doc.user_id, owner);
        assert_eq!(doc.file_type, "application/pdf");
        assert_eq!(doc.file_size, 13);
        assert!(doc.analyzed);
        assert!(doc.file_path.ends_with("_Master_Services.pdf"));
        assert_eq!(doc.metadata["extractionMethod"], "scripted");

        assert_eq!(h.storage.stored().len(), 1);
        assert_eq!(h.service.list_uploaded(owner).await.unwrap().len(), 1);
        let notes = h.db.list_notifications_by_user(owner).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NOTIFICATION_CONTRACT_UPLOADED);
    }

    #[tokio::test]
    async fn failed_extraction_falls_back_to_file_metadata() {
        let h = harness(StaticExtractor::failing());

        let outcome = h
            .service
            .upload_contract(Uuid::new_v4(), "scan.pdf", &[0_u8; 42])
            .await
            .unwrap();

        assert!(outcome.document.content.contains("scan.pdf"));
        assert!(outcome.document.content.contains("42 bytes"));
        assert_eq!(h.delegate.calls(), 1);
    }

    #[tokio::test]
    async fn failed_ai_extraction_removes_the_stored_file() {
        let db = Arc::new(InMemoryDatabase::new());
        let storage = Arc::new(MemoryStorage::default());
        let delegate = Arc::new(ScriptedDelegate::failing("model unavailable"));
        let assistant = ContractAssistant::new(delegate, Duration::from_secs(5));
        let service = UploadService::new(
            db.clone(),
            assistant,
            storage.clone(),
            Arc::new(StaticExtractor::text("LEASE AGREEMENT")),
        );
        let owner = Uuid::new_v4();

        let err = service
            .upload_contract(owner, "lease.pdf", b"%PDF-1.4")
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::AiDelegate(_)));
        assert!(storage.stored().is_empty());
        assert!(service.list_uploaded(owner).await.unwrap().is_empty());
    }

    #[test]
    fn stored_names_are_timestamped_and_sanitized() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            stored_file_name("../../etc/passwd", at).unwrap(),
            "1700000000123_passwd"
        );
        assert_eq!(
            stored_file_name("My Contract (v2).pdf", at).unwrap(),
            "1700000000123_My_Contract_v2_.pdf"
        );
        assert_eq!(stored_file_name("...", at).unwrap(), "1700000000123_upload");
    }

    #[test]
    fn titles_drop_pdf_extension_only() {
        assert_eq!(title_from_file_name("Lease.PDF"), "Lease");
        assert_eq!(title_from_file_name("notes.txt"), "notes.txt");
    }
}
